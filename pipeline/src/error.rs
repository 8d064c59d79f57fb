// src/error.rs

use core::fmt;
use thiserror::Error;

/// Error returned by [`BoundedPriorityQueue::push`](crate::queue::BoundedPriorityQueue::push)
/// when the item could not be admitted. The rejected item is handed back.
#[derive(PartialEq, Eq, Clone)]
pub enum PushError<T> {
  /// The queue is at capacity and the push was non-blocking.
  Full(T),
  /// The queue no longer admits new work.
  Closed(T),
}

impl<T> PushError<T> {
  /// Consumes the error, returning the rejected item.
  #[inline]
  pub fn into_inner(self) -> T {
    match self {
      PushError::Full(v) => v,
      PushError::Closed(v) => v,
    }
  }

  pub fn is_full(&self) -> bool {
    matches!(self, PushError::Full(_))
  }

  pub fn is_closed(&self) -> bool {
    matches!(self, PushError::Closed(_))
  }
}

impl<T> fmt::Debug for PushError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PushError::Full(_) => write!(f, "PushError::Full(..)"),
      PushError::Closed(_) => write!(f, "PushError::Closed(..)"),
    }
  }
}

impl<T> fmt::Display for PushError<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PushError::Full(_) => f.write_str("queue full"),
      PushError::Closed(_) => f.write_str("queue closed"),
    }
  }
}

impl<T> std::error::Error for PushError<T> {}

/// Error returned to producers by the logger's send operations.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum SendError {
  /// Non-blocking send against a saturated queue.
  #[error("logger queue is full")]
  Full,
  /// The logger has accepted a stop directive or has already stopped.
  #[error("logger is closed")]
  Closed,
  /// Copying the payload or target path could not allocate.
  #[error("out of memory while copying message of {requested} bytes")]
  OutOfMemory { requested: usize },
}

impl<T> From<PushError<T>> for SendError {
  fn from(err: PushError<T>) -> Self {
    match err {
      PushError::Full(_) => SendError::Full,
      PushError::Closed(_) => SendError::Closed,
    }
  }
}

/// Errors raised while loading or validating a [`LoggerConfig`](crate::config::LoggerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Configuration file not found: {0}")]
  NotFound(String),

  #[error("Failed to read configuration file: {0}")]
  Read(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  Parse(String),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidValue { field: String, message: String },
}

/// A specialized `Result` type for configuration loading.
pub type ConfigResult<T, E = ConfigError> = std::result::Result<T, E>;

/// Error returned when the worker loop cannot be started.
#[derive(Debug, Error)]
pub enum SpawnError {
  /// A worker has already been handed out for this logger.
  #[error("logger worker is already running")]
  AlreadyRunning,
  /// The OS refused to create the worker thread.
  #[error("failed to spawn logger worker thread: {0}")]
  Io(#[from] std::io::Error),
}
