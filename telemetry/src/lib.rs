//! `tof_telemetry` - configuration-driven `tracing` setup for the time-of-flight rig.
//!
//! A YAML file names a set of appenders (console or file) and a set of loggers,
//! each logger being a target prefix with a minimum level and the appenders it
//! feeds. Records emitted through the `log` facade are bridged into `tracing`.
//!
//! ```no_run
//! let config_path = tof_telemetry::find_config_file(None).expect("config");
//! let _telemetry = tof_telemetry::init_from_file(&config_path).expect("init");
//! tracing::info!(target: "tof_pipeline", "telemetry ready");
//! ```

pub mod config;
pub mod error;
pub mod guards;
pub mod init;

pub use error::{Error, Result};
pub use guards::WorkerGuardCollection;

// Public initialization functions
pub use init::{
  build_subscriber, find_config_file, find_config_file_in, init_from_config, init_from_file,
  init_from_str, parse_config_str,
};

/// Returned by the `init_*` functions.
#[must_use = "The InitResult and its guards must be kept alive for logging to work correctly and flush on exit"]
pub struct InitResult {
  pub guards: WorkerGuardCollection,
}
