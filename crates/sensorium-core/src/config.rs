//! Process configuration.
//!
//! One [`Config`] value is built at startup (CLI flags over these defaults)
//! and injected into the server and scheduler. Nothing reads configuration
//! from ambient state, and nothing reloads it at runtime.

use std::path::PathBuf;
use std::time::Duration;

use crate::anomaly::Thresholds;

/// Default snapshot file name.
pub const DEFAULT_SNAPSHOT_FILE: &str = "sensor_data.bin";
/// Structured export file name prefix.
pub const EXPORT_FILE_PREFIX: &str = "sensor_data_export_";
/// Structured export file name suffix.
pub const EXPORT_FILE_SUFFIX: &str = ".json";

/// Fixed-at-startup process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Receive buffer size per connection, in bytes.
    pub recv_buffer_size: usize,
    /// Cadence at which a simulated sensor emits readings.
    pub sensor_update_interval: Duration,
    /// Interval between binary snapshot writes.
    pub snapshot_interval: Duration,
    /// Interval between structured export drains.
    pub export_interval: Duration,
    /// Interval between logged historical anomaly reports.
    pub report_interval: Duration,
    /// Binary snapshot path.
    pub snapshot_path: PathBuf,
    /// Directory receiving structured export files.
    pub export_dir: PathBuf,
    /// Connection admission bound; `None` is unbounded thread-per-connection.
    pub max_connections: Option<usize>,
    /// Normal operating bounds for the three metrics.
    pub thresholds: Thresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9999,
            recv_buffer_size: 4096,
            sensor_update_interval: Duration::from_secs(5),
            snapshot_interval: Duration::from_secs(60),
            export_interval: Duration::from_secs(300),
            report_interval: Duration::from_secs(60),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            export_dir: PathBuf::from("."),
            max_connections: None,
            thresholds: Thresholds::default(),
        }
    }
}

impl Config {
    /// `host:port` string for bind/connect.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
