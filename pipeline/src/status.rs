//! The out-of-band status log describing the pipeline's own health.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;

/// Appends timestamped diagnostic lines to a file, bypassing the data queue.
///
/// Each call opens the file in append mode, writes one line and closes it.
/// Writers are serialized through an internal lock so lines from concurrent
/// producers never interleave.
#[derive(Debug)]
pub struct StatusLog {
  path: PathBuf,
  write_lock: Mutex<()>,
}

impl StatusLog {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      write_lock: Mutex::new(()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Writes `message` as one line: `<RFC 3339 UTC timestamp> <message>`.
  ///
  /// Trailing newlines in `message` are trimmed and embedded ones are escaped
  /// as `\n` / `\r`, so every entry is exactly one line.
  pub fn write(&self, message: &str) -> io::Result<()> {
    let message = message.trim_end_matches(&['\r', '\n'][..]);
    let mut line = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    line.reserve(message.len() + 2);
    line.push(' ');
    for ch in message.chars() {
      match ch {
        '\n' => line.push_str("\\n"),
        '\r' => line.push_str("\\r"),
        _ => line.push(ch),
      }
    }
    line.push('\n');

    let _guard = self.write_lock.lock();
    append_bytes(&self.path, line.as_bytes())
  }
}

/// Opens `path` for appending (creating it and missing parent directories)
/// and writes `bytes` in full.
pub(crate) fn append_bytes(path: &Path, bytes: &[u8]) -> io::Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() && !parent.exists() {
      fs::create_dir_all(parent)?;
    }
  }
  let mut file = OpenOptions::new().create(true).append(true).open(path)?;
  file.write_all(bytes)?;
  file.flush()
}
