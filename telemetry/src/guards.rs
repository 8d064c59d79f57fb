// src/guards.rs
// Keeps tracing-appender's WorkerGuards alive for as long as logging runs.

use tracing_appender::non_blocking::WorkerGuard;

/// A collection of `WorkerGuard`s from `tracing-appender`.
///
/// Dropping it flushes every non-blocking file writer.
#[must_use = "The guards must be kept alive for file appenders to flush on exit"]
#[derive(Default)]
pub struct WorkerGuardCollection {
  guards: Vec<WorkerGuard>,
}

impl WorkerGuardCollection {
  pub(crate) fn new() -> Self {
    Self { guards: Vec::new() }
  }

  pub(crate) fn add(&mut self, guard: WorkerGuard) {
    self.guards.push(guard);
  }

  pub fn len(&self) -> usize {
    self.guards.len()
  }

  pub fn is_empty(&self) -> bool {
    self.guards.is_empty()
  }
}
