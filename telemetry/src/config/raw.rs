use serde::Deserialize;
use std::collections::HashMap;

// --- Top Level Config ---
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigRaw {
  #[serde(default = "default_version")]
  pub version: u32,
  #[serde(default)] // Appenders can be empty
  pub appenders: HashMap<String, AppenderConfigRaw>,
  #[serde(default)] // Loggers can be empty, will imply a default root
  pub loggers: HashMap<String, LoggerConfigRaw>,
}

fn default_version() -> u32 {
  1
}

// --- Appender Config ---
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum AppenderConfigRaw {
  Console(ConsoleAppenderConfigRaw),
  File(FileAppenderConfigRaw),
}

#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConsoleAppenderConfigRaw {
  #[serde(default)]
  pub format: Option<String>,
  /// Write to stderr instead of stdout.
  #[serde(default)]
  pub stderr: bool,
  #[serde(default = "default_ansi")]
  pub ansi: bool,
}

fn default_ansi() -> bool {
  true
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileAppenderConfigRaw {
  pub path: String,
  #[serde(default)]
  pub format: Option<String>,
}

// --- Logger Config ---
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfigRaw {
  pub level: String,
  #[serde(default)]
  pub appenders: Vec<String>, // Names of appenders
}

impl Default for ConfigRaw {
  fn default() -> Self {
    Self {
      version: default_version(),
      appenders: HashMap::new(),
      loggers: HashMap::new(),
    }
  }
}

impl AppenderConfigRaw {
  /// The optional output format of any appender variant.
  pub fn format(&self) -> Option<&str> {
    match self {
      AppenderConfigRaw::Console(c) => c.format.as_deref(),
      AppenderConfigRaw::File(f) => f.format.as_deref(),
    }
  }
}
