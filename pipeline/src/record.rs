//! Text encoding of a single range measurement.
//!
//! The pipeline itself is payload-agnostic; this is the line format the rig's
//! producer hands to [`Logger::send_log`](crate::Logger::send_log):
//!
//! ```text
//! <epoch seconds, 6 decimals><sep><distance, %.6E><sep><time of flight, %.6E>\n
//! ```
//!
//! Exponents are rendered the way C's `printf("%E")` does (explicit sign and
//! at least two digits) so existing analysis scripts keep parsing the files.

use chrono::Utc;
use std::fmt::Write as _;

/// Time of flight reported by the producer when the chip returned bad data.
pub const INVALID_TIME_OF_FLIGHT: f64 = -1.0;

/// One measurement as written to the results file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRecord {
  /// Seconds since the Unix epoch, microsecond resolution.
  pub timestamp: f64,
  /// Distance in metres.
  pub distance: f64,
  /// Time of flight in seconds.
  pub time_of_flight: f64,
}

impl MeasurementRecord {
  pub fn new(timestamp: f64, distance: f64, time_of_flight: f64) -> Self {
    Self {
      timestamp,
      distance,
      time_of_flight,
    }
  }

  /// A record stamped with the current wall-clock time.
  pub fn now(distance: f64, time_of_flight: f64) -> Self {
    Self::new(epoch_seconds(), distance, time_of_flight)
  }

  /// Whether the time of flight came from a valid chip readout.
  pub fn is_valid(&self) -> bool {
    self.time_of_flight >= 0.0
  }

  /// Encodes the record as one newline-terminated line.
  ///
  /// With `add_break`, an extra empty line follows the record.
  pub fn encode(&self, separator: char, add_break: bool) -> String {
    let mut line = String::with_capacity(64);
    // Writing into a String cannot fail.
    let _ = write!(line, "{:.6}", self.timestamp);
    line.push(separator);
    line.push_str(&c_exponent(self.distance, 6));
    line.push(separator);
    line.push_str(&c_exponent(self.time_of_flight, 6));
    if add_break {
      line.push('\n');
    }
    line.push('\n');
    line
  }

  /// Parses a line produced by [`encode`](Self::encode). Blank lines yield `None`.
  pub fn parse(line: &str, separator: char) -> Option<Self> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    if line.is_empty() {
      return None;
    }
    let mut fields = line.split(separator);
    let timestamp = fields.next()?.parse().ok()?;
    let distance = fields.next()?.parse().ok()?;
    let time_of_flight = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
      return None;
    }
    Some(Self::new(timestamp, distance, time_of_flight))
  }
}

/// Current time as fractional seconds since the Unix epoch.
pub fn epoch_seconds() -> f64 {
  Utc::now().timestamp_micros() as f64 * 1e-6
}

/// Formats `value` like C's `%.<precision>E`.
fn c_exponent(value: f64, precision: usize) -> String {
  if value.is_nan() {
    return "NAN".to_string();
  }
  if value.is_infinite() {
    return if value.is_sign_negative() { "-INF" } else { "INF" }.to_string();
  }

  let rust_style = format!("{:.*E}", precision, value);
  let (mantissa, exponent) = match rust_style.split_once('E') {
    Some(parts) => parts,
    None => return rust_style,
  };
  let exponent: i32 = exponent.parse().unwrap_or(0);
  let sign = if exponent < 0 { '-' } else { '+' };
  format!("{}E{}{:02}", mantissa, sign, exponent.abs())
}
