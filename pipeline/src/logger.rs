//! The producer-facing logger handle.

use crate::config::LoggerConfig;
use crate::error::{ConfigError, ConfigResult, SendError, SpawnError};
use crate::message::Message;
use crate::queue::BoundedPriorityQueue;
use crate::state::{LifecycleState, StateCell};
use crate::status::StatusLog;
use crate::worker::{Worker, WorkerSummary};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Name given to the thread started by [`Logger::spawn_worker`].
pub const WORKER_THREAD_NAME: &str = "tof-logger";

/// State shared between every logger handle and the worker.
#[derive(Debug)]
pub(crate) struct LoggerShared {
  pub(crate) queue: BoundedPriorityQueue<Message>,
  pub(crate) status: StatusLog,
  pub(crate) state: StateCell,
  /// Set once a worker has been handed out; there is only ever one consumer.
  pub(crate) worker_claimed: AtomicBool,
  /// Number of live `Logger` handles. The worker is not counted.
  handle_count: AtomicUsize,
}

/// A cloneable handle to the logging pipeline.
///
/// Producers call [`send_log`](Self::send_log) and [`send_close`](Self::send_close)
/// from any thread. The messages are executed by a single [`Worker`], started
/// with [`spawn_worker`](Self::spawn_worker) or run on a caller-provided thread
/// via [`worker`](Self::worker).
///
/// When the last handle is dropped without a close directive, the queue stops
/// admitting work; the worker still executes everything already queued and
/// then returns.
#[derive(Debug)]
pub struct Logger {
  shared: Arc<LoggerShared>,
}

impl Logger {
  /// Creates a logger with a queue of `capacity` messages.
  ///
  /// The logger starts `Idle`. No worker is running until one is started.
  ///
  /// # Panics
  ///
  /// Panics if `capacity` is zero.
  pub fn create(capacity: usize, status_log_path: impl Into<PathBuf>) -> Self {
    Self::with_queue(BoundedPriorityQueue::new(capacity), status_log_path.into())
  }

  /// Like [`create`](Self::create), but rejects a zero capacity instead of panicking.
  pub fn try_create(capacity: usize, status_log_path: impl Into<PathBuf>) -> ConfigResult<Self> {
    let queue = BoundedPriorityQueue::try_new(capacity).ok_or_else(|| ConfigError::InvalidValue {
      field: "capacity".to_string(),
      message: "Queue capacity must be at least 1.".to_string(),
    })?;
    Ok(Self::with_queue(queue, status_log_path.into()))
  }

  fn with_queue(queue: BoundedPriorityQueue<Message>, status_log_path: PathBuf) -> Self {
    let capacity = queue.capacity();
    let state = StateCell::new(LifecycleState::Uninit);
    let shared = LoggerShared {
      queue,
      status: StatusLog::new(status_log_path),
      state,
      worker_claimed: AtomicBool::new(false),
      handle_count: AtomicUsize::new(1),
    };
    // Construction is complete; Uninit -> Idle cannot fail from a fresh cell.
    let _ = shared.state.transition(LifecycleState::Idle);

    tracing::debug!(
      capacity,
      status_log = %shared.status.path().display(),
      "logger created"
    );

    Self {
      shared: Arc::new(shared),
    }
  }

  /// Creates a logger from validated configuration.
  pub fn from_config(config: &LoggerConfig) -> Self {
    Self::create(config.capacity, config.status_log_path.clone())
  }

  /// Queues `data` to be appended to `target_path`.
  ///
  /// Both are copied before this returns. With `blocking`, a full queue
  /// suspends the caller until the worker frees a slot; otherwise the call
  /// fails with [`SendError::Full`].
  pub fn send_log(
    &self,
    data: &[u8],
    target_path: impl AsRef<Path>,
    priority: u32,
    blocking: bool,
  ) -> Result<(), SendError> {
    if self.state() == LifecycleState::Stopped {
      return Err(SendError::Closed);
    }

    let message = Message::log(data, target_path.as_ref(), priority)?;
    self.shared.queue.push(message, blocking).map_err(|err| {
      tracing::warn!(
        target_path = %target_path.as_ref().display(),
        priority,
        blocking,
        "log message rejected: {}",
        err
      );
      SendError::from(err)
    })
  }

  /// Queues the stop directive.
  ///
  /// After it is accepted, every further send returns [`SendError::Closed`].
  /// Messages already queued with a lower priority value are executed before
  /// the worker stops; the rest are handed back by [`destroy`](Self::destroy).
  pub fn send_close(&self, priority: u32, blocking: bool) -> Result<(), SendError> {
    if self.state() == LifecycleState::Stopped {
      return Err(SendError::Closed);
    }

    self
      .shared
      .queue
      .push_last(Message::stop(priority), blocking)
      .map_err(SendError::from)?;
    tracing::debug!(priority, "close directive accepted");
    Ok(())
  }

  /// Writes `message` straight to the status log, bypassing the queue.
  pub fn log_status(&self, message: &str) -> io::Result<()> {
    self.shared.status.write(message)
  }

  /// Hands out the worker loop for this logger.
  ///
  /// Returns `None` if a worker was already handed out.
  pub fn worker(&self) -> Option<Worker> {
    if self
      .shared
      .worker_claimed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return None;
    }
    Some(Worker::new(self.shared.clone()))
  }

  /// Starts the worker loop on a dedicated, named thread.
  pub fn spawn_worker(&self) -> Result<JoinHandle<WorkerSummary>, SpawnError> {
    let worker = self.worker().ok_or(SpawnError::AlreadyRunning)?;
    let handle = thread::Builder::new()
      .name(WORKER_THREAD_NAME.to_string())
      .spawn(move || worker.run())?;
    Ok(handle)
  }

  /// Tears the logger down and returns every message that was never executed.
  ///
  /// Intended to be called after the worker has stopped. If it is called
  /// earlier, the queue is closed so the worker exits once it is empty, and
  /// the residual messages are still returned rather than lost.
  pub fn destroy(self) -> Vec<Message> {
    let state = self.state();
    self.shared.queue.close();
    let residual = self.shared.queue.drain();

    if state != LifecycleState::Stopped {
      tracing::warn!(
        state = %state,
        undelivered = residual.len(),
        "logger destroyed before the worker stopped"
      );
      let _ = self.shared.status.write(&format!(
        "logger destroyed while {}; {} message(s) returned undelivered",
        state,
        residual.len()
      ));
    } else if !residual.is_empty() {
      tracing::info!(undelivered = residual.len(), "returning messages queued behind stop");
    }

    residual
  }

  /// Sends the stop directive, waits for the worker and destroys the logger.
  ///
  /// A logger that is already closing is not an error here; the join and
  /// drain still happen.
  pub fn shutdown(
    self,
    priority: u32,
    worker: JoinHandle<WorkerSummary>,
  ) -> (Option<WorkerSummary>, Vec<Message>) {
    match self.send_close(priority, true) {
      Ok(()) | Err(SendError::Closed) => {}
      Err(err) => tracing::warn!("close directive failed during shutdown: {}", err),
    }

    let summary = match worker.join() {
      Ok(summary) => Some(summary),
      Err(_) => {
        tracing::error!("logger worker panicked");
        let _ = self.log_status("logger worker panicked");
        None
      }
    };

    (summary, self.destroy())
  }

  /// The current lifecycle state.
  pub fn state(&self) -> LifecycleState {
    self.shared.state.load()
  }

  /// Whether the queue has stopped admitting new work.
  pub fn is_closed(&self) -> bool {
    self.shared.queue.is_closed()
  }

  /// Returns the number of messages waiting to be executed.
  pub fn len(&self) -> usize {
    self.shared.queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns the fixed queue capacity.
  pub fn capacity(&self) -> usize {
    self.shared.queue.capacity()
  }

  pub fn status_log_path(&self) -> &Path {
    self.shared.status.path()
  }
}

impl Clone for Logger {
  fn clone(&self) -> Self {
    self.shared.handle_count.fetch_add(1, Ordering::Relaxed);
    Self {
      shared: self.shared.clone(),
    }
  }
}

impl Drop for Logger {
  fn drop(&mut self) {
    if self.shared.handle_count.fetch_sub(1, Ordering::AcqRel) == 1 {
      // Last producer handle: nothing new can arrive, so let the worker
      // finish what is queued and return.
      self.shared.queue.close();
    }
  }
}
