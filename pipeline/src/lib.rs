//! Asynchronous priority logging pipeline for a time-of-flight measurement rig.
//!
//! The measurement loop must never stall on disk I/O, so records are handed to
//! a [`Logger`], copied into [`Message`]s and parked in a bounded priority queue.
//! A single [`Worker`] thread drains the queue and appends each payload to its
//! target file. Lower priority values are served first; equal priorities keep
//! their arrival order.
//!
//! ```no_run
//! use tof_pipeline::{Logger, MeasurementRecord};
//!
//! let logger = Logger::create(100, "./logger_status.log");
//! let worker = logger.spawn_worker().expect("spawn worker");
//!
//! let line = MeasurementRecord::now(1.25, 8.34e-9).encode(',', false);
//! logger.send_log(line.as_bytes(), "./tof_vals.txt", 0, true).expect("send");
//!
//! let (_summary, undelivered) = logger.shutdown(0, worker);
//! assert!(undelivered.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod logger;
pub mod message;
pub mod queue;
pub mod record;
pub mod state;
pub mod status;
pub mod worker;

pub use config::LoggerConfig;
pub use error::{ConfigError, PushError, SendError, SpawnError};
pub use logger::Logger;
pub use message::{Command, Message};
pub use queue::{BoundedPriorityQueue, Prioritized};
pub use record::MeasurementRecord;
pub use state::LifecycleState;
pub use status::StatusLog;
pub use worker::{Worker, WorkerSummary};
