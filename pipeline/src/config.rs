// src/config.rs
// Configuration for a logger instance and the producer defaults that go with it.

use crate::error::{ConfigError, ConfigResult};

use serde::Deserialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Queue capacity used by the rig when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_STATUS_LOG_PATH: &str = "./logger_status.log";
pub const DEFAULT_RESULTS_PATH: &str = "./tof_vals.txt";
pub const DEFAULT_RECORD_SEPARATOR: char = ',';

// --- Raw config, mirrors the YAML document ---

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfigRaw {
  #[serde(default = "default_capacity")]
  pub capacity: usize,
  #[serde(default = "default_status_log_path")]
  pub status_log_path: String,
  #[serde(default = "default_results_path")]
  pub results_path: String,
  #[serde(default = "default_record_separator")]
  pub record_separator: String,
  #[serde(default)]
  pub priority: u32,
  #[serde(default = "default_blocking")]
  pub blocking: bool,
}

fn default_capacity() -> usize {
  DEFAULT_CAPACITY
}

fn default_status_log_path() -> String {
  DEFAULT_STATUS_LOG_PATH.to_string()
}

fn default_results_path() -> String {
  DEFAULT_RESULTS_PATH.to_string()
}

fn default_record_separator() -> String {
  DEFAULT_RECORD_SEPARATOR.to_string()
}

fn default_blocking() -> bool {
  true
}

impl Default for LoggerConfigRaw {
  fn default() -> Self {
    Self {
      capacity: default_capacity(),
      status_log_path: default_status_log_path(),
      results_path: default_results_path(),
      record_separator: default_record_separator(),
      priority: 0,
      blocking: default_blocking(),
    }
  }
}

// --- Processed config ---

/// Validated settings for a [`Logger`](crate::Logger) and its producer.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
  /// Maximum number of queued messages.
  pub capacity: usize,
  /// Where the logger writes its own diagnostic lines.
  pub status_log_path: PathBuf,
  /// Where measurement records are appended.
  pub results_path: PathBuf,
  /// Field separator used when encoding records.
  pub record_separator: char,
  /// Priority the producer attaches to records and to the close directive.
  pub priority: u32,
  /// Whether the producer applies backpressure (`true`) or fails fast.
  pub blocking: bool,
}

impl Default for LoggerConfig {
  fn default() -> Self {
    Self {
      capacity: DEFAULT_CAPACITY,
      status_log_path: PathBuf::from(DEFAULT_STATUS_LOG_PATH),
      results_path: PathBuf::from(DEFAULT_RESULTS_PATH),
      record_separator: DEFAULT_RECORD_SEPARATOR,
      priority: 0,
      blocking: true,
    }
  }
}

impl LoggerConfig {
  /// Parses and validates a YAML document.
  pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
    let raw: LoggerConfigRaw =
      serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Self::try_from(raw)
  }

  /// Loads and validates a YAML configuration file.
  pub fn from_file(path: &Path) -> ConfigResult<Self> {
    let file = File::open(path).map_err(|e| match e.kind() {
      io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
      _ => ConfigError::Read(e),
    })?;
    let raw: LoggerConfigRaw = serde_yaml::from_reader(io::BufReader::new(file))
      .map_err(|e| ConfigError::Parse(e.to_string()))?;
    Self::try_from(raw)
  }
}

impl TryFrom<LoggerConfigRaw> for LoggerConfig {
  type Error = ConfigError;

  fn try_from(raw: LoggerConfigRaw) -> ConfigResult<Self> {
    if raw.capacity == 0 {
      return Err(ConfigError::InvalidValue {
        field: "capacity".to_string(),
        message: "Queue capacity must be at least 1.".to_string(),
      });
    }

    if raw.status_log_path.is_empty() {
      return Err(ConfigError::InvalidValue {
        field: "status_log_path".to_string(),
        message: "Status log path cannot be empty.".to_string(),
      });
    }

    if raw.results_path.is_empty() {
      return Err(ConfigError::InvalidValue {
        field: "results_path".to_string(),
        message: "Results path cannot be empty.".to_string(),
      });
    }

    let mut chars = raw.record_separator.chars();
    let record_separator = match (chars.next(), chars.next()) {
      (Some(c), None) if c != '\n' && c != '\r' => c,
      _ => {
        return Err(ConfigError::InvalidValue {
          field: "record_separator".to_string(),
          message: format!(
            "Expected a single non-newline character, got {:?}.",
            raw.record_separator
          ),
        })
      }
    };

    Ok(Self {
      capacity: raw.capacity,
      status_log_path: PathBuf::from(raw.status_log_path),
      results_path: PathBuf::from(raw.results_path),
      record_separator,
      priority: raw.priority,
      blocking: raw.blocking,
    })
  }
}
