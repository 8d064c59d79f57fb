// src/config/processed.rs
use crate::config::raw::{AppenderConfigRaw, ConfigRaw, LoggerConfigRaw};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::Level;
use tracing_core::metadata::LevelFilter;

pub const ROOT_LOGGER: &str = "root";

// --- Processed Top Level Config ---
#[derive(Debug, Clone)]
pub struct ConfigInternal {
  pub appenders: HashMap<String, AppenderInternal>,
  pub loggers: HashMap<String, LoggerInternal>,
}

// --- Processed Appender Config ---
#[derive(Debug, Clone)]
pub struct AppenderInternal {
  pub name: String,
  pub kind: AppenderKindInternal,
  pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppenderKindInternal {
  Console { stderr: bool, ansi: bool },
  File { path: PathBuf },
}

/// Line layout used by the `fmt` layer of an appender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
  #[default]
  Full,
  Compact,
}

// --- Processed Logger Config ---
#[derive(Debug, Clone)]
pub struct LoggerInternal {
  pub name: String,
  pub min_level: LevelFilter,
  pub appender_names: Vec<String>,
}

// --- Conversion and Validation Logic ---

/// Processes the raw, deserialized configuration into a validated internal representation.
pub fn process_raw_config(raw_config: ConfigRaw) -> Result<ConfigInternal> {
  if raw_config.version != 1 {
    return Err(Error::InvalidConfigValue {
      field: "version".to_string(),
      message: format!("Unsupported config version {}. Expected 1.", raw_config.version),
    });
  }

  let mut processed_appenders = HashMap::new();
  let mut processed_loggers = HashMap::new();

  // 1. Process Appenders
  for (name, raw_appender) in raw_config.appenders {
    let format = parse_format(raw_appender.format(), &name)?;

    let kind = match raw_appender {
      AppenderConfigRaw::Console(raw_console) => AppenderKindInternal::Console {
        stderr: raw_console.stderr,
        ansi: raw_console.ansi,
      },
      AppenderConfigRaw::File(raw_file) => {
        if raw_file.path.is_empty() {
          return Err(Error::InvalidConfigValue {
            field: format!("appenders.{}.path", name),
            message: "File appender path cannot be empty.".to_string(),
          });
        }
        AppenderKindInternal::File {
          path: PathBuf::from(raw_file.path),
        }
      }
    };

    processed_appenders.insert(name.clone(), AppenderInternal { name, kind, format });
  }

  // 2. Process Loggers
  // Ensure there's a "root" logger, providing a default if not.
  let mut raw_loggers = raw_config.loggers;
  raw_loggers
    .entry(ROOT_LOGGER.to_string())
    .or_insert_with(|| LoggerConfigRaw {
      level: "info".to_string(),
      appenders: Vec::new(),
    });

  for (name, raw_logger) in raw_loggers {
    let min_level = parse_level_filter(&raw_logger.level, &name)?;

    // Validate that specified appenders actually exist
    for appender_name in &raw_logger.appenders {
      if !processed_appenders.contains_key(appender_name) {
        return Err(Error::InvalidConfigValue {
          field: format!("loggers.{}.appenders", name),
          message: format!(
            "Logger '{}' refers to undefined appender '{}'. Available appenders: {:?}",
            name,
            appender_name,
            processed_appenders.keys()
          ),
        });
      }
    }

    processed_loggers.insert(
      name.clone(),
      LoggerInternal {
        name,
        min_level,
        appender_names: raw_logger.appenders,
      },
    );
  }

  Ok(ConfigInternal {
    appenders: processed_appenders,
    loggers: processed_loggers,
  })
}

fn parse_format(format: Option<&str>, appender_name: &str) -> Result<OutputFormat> {
  match format.map(str::to_lowercase).as_deref() {
    None | Some("full") => Ok(OutputFormat::Full),
    Some("compact") => Ok(OutputFormat::Compact),
    Some(other) => Err(Error::InvalidConfigValue {
      field: format!("appenders.{}.format", appender_name),
      message: format!("Unknown format '{}'. Expected 'full' or 'compact'.", other),
    }),
  }
}

fn parse_level_filter(level_str: &str, logger_name: &str) -> Result<LevelFilter> {
  // Special case for "OFF" which is not a `tracing::Level`
  if level_str.eq_ignore_ascii_case("off") {
    return Ok(LevelFilter::OFF);
  }

  level_str
    .to_uppercase()
    .parse::<Level>()
    .map(LevelFilter::from_level)
    .map_err(|_| Error::InvalidConfigValue {
      field: format!("loggers.{}.level", logger_name),
      message: format!(
        "Invalid log level string '{}'. Expected TRACE, DEBUG, INFO, WARN, ERROR, or OFF.",
        level_str
      ),
    })
}
