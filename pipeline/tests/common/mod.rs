#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tof_pipeline::Logger;

pub const SHORT_TIMEOUT: Duration = Duration::from_millis(100);
pub const LONG_TIMEOUT: Duration = Duration::from_secs(3);
pub const STRESS_TIMEOUT: Duration = Duration::from_secs(15);
pub const ITEMS_LOW: usize = 50;
pub const ITEMS_MEDIUM: usize = 200;
pub const ITEMS_HIGH: usize = 1000;

/// A logger whose status log and targets live in a temporary directory.
pub struct Fixture {
  pub dir: tempfile::TempDir,
  pub logger: Logger,
}

impl Fixture {
  pub fn new(capacity: usize) -> Self {
    let dir = tempfile::tempdir().expect("create temp dir");
    let logger = Logger::create(capacity, dir.path().join("status.log"));
    Self { dir, logger }
  }

  pub fn path(&self, name: &str) -> PathBuf {
    self.dir.path().join(name)
  }
}

pub fn read_lines(path: &Path) -> Vec<String> {
  std::fs::read_to_string(path)
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}
