//! The single consumer that executes queued messages.

use crate::logger::LoggerShared;
use crate::message::{Command, Message};
use crate::state::LifecycleState;
use crate::status;

use std::sync::Arc;

/// Counters reported by a worker when its loop returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
  /// Messages taken off the queue and executed, including the stop directive.
  pub executed: u64,
  /// LOG messages whose append failed. They still count as executed.
  pub failed_writes: u64,
  /// `true` if the loop ended on a stop directive, `false` if the queue was
  /// torn down underneath it.
  pub stopped: bool,
}

/// The worker loop for one logger. Obtained from
/// [`Logger::worker`](crate::Logger::worker).
#[derive(Debug)]
pub struct Worker {
  shared: Arc<LoggerShared>,
}

impl Worker {
  pub(crate) fn new(shared: Arc<LoggerShared>) -> Self {
    Self { shared }
  }

  /// Runs until a stop directive is executed, blocking on the queue while idle.
  ///
  /// Write failures are recorded in the status log and never end the loop.
  pub fn run(self) -> WorkerSummary {
    let mut summary = WorkerSummary::default();
    self.enter(LifecycleState::Idle);
    self.status(&format!(
      "logger worker started (capacity {})",
      self.shared.queue.capacity()
    ));

    loop {
      let message = match self.shared.queue.pop() {
        Some(message) => message,
        None => {
          tracing::warn!(
            executed = summary.executed,
            "logger queue closed without a stop directive"
          );
          self.status("logger queue closed without a stop directive; worker exiting");
          break;
        }
      };

      self.enter(LifecycleState::Working);
      summary.executed += 1;

      match message.command() {
        Command::Log => {
          if !self.execute_log(&message) {
            summary.failed_writes += 1;
          }
          self.enter(LifecycleState::Idle);
        }
        Command::Stop => {
          self.shared.queue.close();
          self.enter(LifecycleState::Stopped);
          summary.stopped = true;
          self.status(&format!(
            "logger worker stopped ({} executed, {} failed writes, {} left queued)",
            summary.executed,
            summary.failed_writes,
            self.shared.queue.len()
          ));
          break;
        }
      }
    }

    tracing::info!(
      executed = summary.executed,
      failed_writes = summary.failed_writes,
      stopped = summary.stopped,
      "logger worker exited"
    );
    summary
  }

  /// Appends the payload to its target. Returns `false` if the write failed.
  fn execute_log(&self, message: &Message) -> bool {
    let target = match message.target_path() {
      Some(path) => path,
      None => return true,
    };

    match status::append_bytes(target, message.payload()) {
      Ok(()) => {
        tracing::trace!(target_path = %target.display(), len = message.len(), "appended");
        true
      }
      Err(err) => {
        tracing::warn!(
          target_path = %target.display(),
          len = message.len(),
          error = %err,
          "failed to append log message"
        );
        self.status(&format!(
          "failed to append {} bytes to {}: {}",
          message.len(),
          target.display(),
          err
        ));
        false
      }
    }
  }

  fn enter(&self, next: LifecycleState) {
    match self.shared.state.transition(next) {
      Ok(previous) if previous != next => {
        tracing::debug!(from = %previous, to = %next, "logger state")
      }
      Ok(_) => {}
      Err(current) => {
        tracing::error!(from = %current, to = %next, "illegal logger state transition")
      }
    }
  }

  /// Best-effort status line; a failing status log must not stop the loop.
  fn status(&self, line: &str) {
    if let Err(err) = self.shared.status.write(line) {
      tracing::error!(
        status_log = %self.shared.status.path().display(),
        error = %err,
        "failed to write status log"
      );
    }
  }
}
