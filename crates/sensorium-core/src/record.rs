//! Sensor record model and canonical timestamp handling.
//!
//! Every reading that enters the system becomes a [`SensorRecord`]: one
//! immutable measurement of temperature, humidity, and light, tagged with a
//! timestamp and the reporting sensor's id. Records are appended once, never
//! mutated, and copied freely by search and persistence.
//!
//! Timestamps are strings in one canonical fixed-width format,
//! `YYYY-MM-DDTHH:MM:SS.sssZ` (UTC, millisecond precision). Keeping the format
//! uniform is load-bearing: range filtering and sorting compare timestamps
//! lexicographically, which matches chronological order only when every stored
//! string has the same width and offset. [`normalize_timestamp`] enforces this
//! at the ingest boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical timestamp format: ISO-8601 UTC with millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// One ingested sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Canonical-format timestamp (see [`TIMESTAMP_FORMAT`]).
    pub timestamp: String,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Illuminance in lux.
    pub light: f64,
    /// Identifier of the reporting sensor.
    pub sensor_id: String,
}

/// Current time rendered in the canonical timestamp format.
pub fn current_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a client-supplied timestamp and re-render it canonically.
///
/// Accepts any RFC 3339 datetime (with or without fractional seconds, any
/// offset) and converts to UTC millisecond form. Returns `None` for anything
/// unparseable — callers treat that as a decode error rather than storing a
/// string that would break lexicographic ordering.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string())
}
