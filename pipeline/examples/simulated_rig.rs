//! Runs the logging pipeline against a synthetic time-of-flight source.
//!
//! Reads `tof_rig.yaml` from the working directory when present and
//! `tof_telemetry[.<env>].yaml` for diagnostics, falling back to defaults.
//!
//! ```text
//! cargo run -p tof_pipeline --example simulated_rig -- 200
//! ```

use std::path::Path;
use std::thread;
use std::time::Duration;

use tof_pipeline::record::INVALID_TIME_OF_FLIGHT;
use tof_pipeline::{LoggerConfig, Logger, MeasurementRecord};

const SPEED_OF_LIGHT: f64 = 299_792_458.0;
const DEFAULT_SAMPLES: usize = 100;
const SAMPLE_PERIOD: Duration = Duration::from_millis(5);

const FALLBACK_TELEMETRY: &str = r#"
appenders:
  console:
    kind: console
    format: compact
loggers:
  root:
    level: info
    appenders: [console]
  tof_pipeline:
    level: debug
    appenders: [console]
"#;

/// Every 17th readout fails parity, as a flaky chip would.
fn read_time_of_flight(sample: usize) -> f64 {
  if sample % 17 == 16 {
    return INVALID_TIME_OF_FLIGHT;
  }
  let wobble = (sample as f64 * 0.1).sin() * 0.5e-9;
  10.0e-9 + wobble
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let _telemetry = match tof_telemetry::find_config_file(None) {
    Ok(path) => tof_telemetry::init_from_file(&path)?,
    Err(_) => tof_telemetry::init_from_str(FALLBACK_TELEMETRY)?,
  };

  let config_path = Path::new("tof_rig.yaml");
  let config = if config_path.is_file() {
    LoggerConfig::from_file(config_path)?
  } else {
    LoggerConfig::default()
  };
  let samples = std::env::args()
    .nth(1)
    .and_then(|arg| arg.parse().ok())
    .unwrap_or(DEFAULT_SAMPLES);

  let logger = Logger::from_config(&config);
  let worker = logger.spawn_worker()?;
  tracing::info!(samples, results = %config.results_path.display(), "rig started");

  for sample in 0..samples {
    let tof = read_time_of_flight(sample);
    let record = if tof < 0.0 {
      tracing::warn!(sample, "invalid readout");
      MeasurementRecord::now(INVALID_TIME_OF_FLIGHT, INVALID_TIME_OF_FLIGHT)
    } else {
      MeasurementRecord::now(tof * SPEED_OF_LIGHT / 2.0, tof)
    };

    let line = record.encode(config.record_separator, true);
    if let Err(err) = logger.send_log(
      line.as_bytes(),
      &config.results_path,
      config.priority,
      config.blocking,
    ) {
      tracing::warn!(sample, "record dropped: {}", err);
    }
    thread::sleep(SAMPLE_PERIOD);
  }

  let (summary, undelivered) = logger.shutdown(config.priority, worker);
  tracing::info!(?summary, undelivered = undelivered.len(), "rig stopped");
  Ok(())
}
