// Contains the primary public initialization functions for tof_telemetry.

use crate::{
  config::{
    processed::{
      process_raw_config, AppenderInternal, AppenderKindInternal, ConfigInternal, LoggerInternal,
      OutputFormat, ROOT_LOGGER,
    },
    raw::ConfigRaw,
  },
  error::{Error, Result},
  guards::WorkerGuardCollection,
  InitResult,
};

use std::{
  collections::HashMap,
  env,
  fs::{self, File as StdFsFile, OpenOptions},
  io,
  path::{Path, PathBuf},
};

use tracing::Subscriber;
use tracing_core::metadata::LevelFilter;
use tracing_subscriber::{
  filter::Targets,
  fmt::{self, MakeWriter},
  prelude::*,
  Layer, Registry,
};

const DEFAULT_CONFIG_BASE_NAME: &str = "tof_telemetry";
const DEFAULT_CONFIG_EXTENSION: &str = "yaml";

/// A type-erased, filtered appender layer.
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Finds the configuration file based on common patterns and an optional environment suffix.
///
/// Looks for `tof_telemetry.<env>.yaml` and then `tof_telemetry.yaml` in `dir`,
/// where `<env>` comes from the argument, `TOF_ENV` or `APP_ENV`.
pub fn find_config_file_in(dir: &Path, environment_suffix: Option<&str>) -> Result<PathBuf> {
  let base_name = DEFAULT_CONFIG_BASE_NAME;
  let extension = DEFAULT_CONFIG_EXTENSION;

  let env_from_var = environment_suffix
    .map(|s| s.to_string())
    .or_else(|| env::var("TOF_ENV").ok())
    .or_else(|| env::var("APP_ENV").ok());

  let mut files_to_check: Vec<String> = Vec::new();
  if let Some(env_str) = &env_from_var {
    if !env_str.is_empty() {
      files_to_check.push(format!("{}.{}.{}", base_name, env_str, extension));
    }
  }
  files_to_check.push(format!("{}.{}", base_name, extension));

  for file_name in &files_to_check {
    let path = dir.join(file_name);
    if path.is_file() {
      return Ok(path);
    }
  }

  Err(Error::ConfigNotFound(format!(
    "Searched for: {:?} in {:?}. Provide a config file or check TOF_ENV/APP_ENV.",
    files_to_check, dir
  )))
}

/// [`find_config_file_in`] for the current working directory.
pub fn find_config_file(environment_suffix: Option<&str>) -> Result<PathBuf> {
  find_config_file_in(Path::new("."), environment_suffix)
}

/// Parses and validates a YAML configuration document.
pub fn parse_config_str(yaml: &str) -> Result<ConfigInternal> {
  let raw_config: ConfigRaw =
    serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse(e.to_string()))?;
  process_raw_config(raw_config)
}

/// Initializes `tof_telemetry` from a configuration file path.
pub fn init_from_file(config_path: &Path) -> Result<InitResult> {
  println!(
    "[tof_telemetry] Initializing from config file: {:?}",
    config_path
  );

  let file = StdFsFile::open(config_path)?;
  let reader = io::BufReader::new(file);
  let raw_config: ConfigRaw =
    serde_yaml::from_reader(reader).map_err(|e| Error::ConfigParse(e.to_string()))?;

  init_from_config(&process_raw_config(raw_config)?)
}

/// Initializes `tof_telemetry` from a YAML string.
pub fn init_from_str(yaml: &str) -> Result<InitResult> {
  init_from_config(&parse_config_str(yaml)?)
}

/// Installs the `log` bridge and a global subscriber built from `config`.
///
/// Can succeed only once per process.
pub fn init_from_config(config: &ConfigInternal) -> Result<InitResult> {
  let (subscriber, guards) = build_subscriber(config)?;

  tracing_log::LogTracer::init().map_err(|e| Error::LogBridgeInit(e.to_string()))?;
  tracing::subscriber::set_global_default(subscriber)
    .map_err(|e| Error::GlobalSubscriberSet(e.to_string()))?;

  Ok(InitResult { guards })
}

/// Builds a subscriber without installing it.
///
/// Useful for scoping output with `tracing::subscriber::with_default`. The
/// returned guards must outlive the subscriber for file output to be flushed.
pub fn build_subscriber(
  config: &ConfigInternal,
) -> Result<(impl Subscriber + Send + Sync + 'static, WorkerGuardCollection)> {
  let mut guards = WorkerGuardCollection::new();
  let mut layers: Vec<BoxedLayer> = Vec::with_capacity(config.appenders.len());

  // Sorted so that setup failures are reported deterministically.
  let mut names: Vec<&String> = config.appenders.keys().collect();
  names.sort();

  for name in names {
    let appender = &config.appenders[name];
    let filter = build_filter_for_appender(name, &config.loggers);
    layers.push(build_appender_layer(appender, filter, &mut guards)?);
  }

  Ok((tracing_subscriber::registry().with(layers), guards))
}

fn build_appender_layer(
  appender: &AppenderInternal,
  filter: Targets,
  guards: &mut WorkerGuardCollection,
) -> Result<BoxedLayer> {
  let layer = match &appender.kind {
    AppenderKindInternal::Console { stderr: true, ansi } => {
      formatted_layer(io::stderr, appender.format, *ansi)
    }
    AppenderKindInternal::Console { stderr: false, ansi } => {
      formatted_layer(io::stdout, appender.format, *ansi)
    }
    AppenderKindInternal::File { path } => {
      if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
          fs::create_dir_all(parent_dir).map_err(|e| Error::AppenderSetup {
            appender_name: appender.name.clone(),
            reason: format!("Failed to create directory {:?}: {}", parent_dir, e),
          })?;
        }
      }

      let file_writer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::AppenderSetup {
          appender_name: appender.name.clone(),
          reason: format!("Failed to open file {:?}: {}", path, e),
        })?;

      let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_writer);
      guards.add(guard);
      formatted_layer(non_blocking_writer, appender.format, false)
    }
  };

  Ok(layer.with_filter(filter).boxed())
}

fn formatted_layer<W>(writer: W, format: OutputFormat, ansi: bool) -> BoxedLayer
where
  W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
  match format {
    OutputFormat::Full => fmt::layer().with_writer(writer).with_ansi(ansi).boxed(),
    OutputFormat::Compact => fmt::layer()
      .compact()
      .with_writer(writer)
      .with_ansi(ansi)
      .boxed(),
  }
}

/// Constructs the target filter for one appender from all logger configurations.
///
/// The root logger's level is the default if it lists the appender; every other
/// logger that lists the appender adds a rule for its target prefix.
fn build_filter_for_appender(
  appender_name_to_build: &str,
  loggers: &HashMap<String, LoggerInternal>,
) -> Targets {
  let mut default_level = LevelFilter::OFF;
  if let Some(root_logger) = loggers.get(ROOT_LOGGER) {
    if root_logger
      .appender_names
      .iter()
      .any(|name| name == appender_name_to_build)
    {
      default_level = root_logger.min_level;
    }
  }

  let mut targets = Targets::new().with_default(default_level);
  for (logger_name, logger_config) in loggers {
    if logger_name == ROOT_LOGGER {
      continue;
    }
    if logger_config
      .appender_names
      .iter()
      .any(|name| name == appender_name_to_build)
    {
      targets = targets.with_target(logger_config.name.clone(), logger_config.min_level);
    }
  }
  targets
}
