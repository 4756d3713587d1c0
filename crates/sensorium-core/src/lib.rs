//! # sensorium-core
//!
//! Core library for a streamed environment-telemetry service: sensors push
//! temperature/humidity/light readings, the service keeps them in a shared
//! in-memory log, scores threshold violations, and periodically persists the
//! log to a binary checkpoint and human-readable JSON exports.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use sensorium_core::{InMemoryLog, SensorRecord, SortKey, TelemetryLog, Thresholds, search};
//!
//! let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
//! log.append(SensorRecord {
//!     timestamp: "2024-01-02T10:30:00.000Z".to_string(),
//!     temperature: 30.0,
//!     humidity: 50.0,
//!     light: 500.0,
//!     sensor_id: "greenhouse-3".to_string(),
//! });
//!
//! let findings = search(
//!     &log.snapshot(),
//!     "",
//!     "",
//!     SortKey::Deviation,
//!     true,
//!     &Thresholds::default(),
//! );
//! assert_eq!(findings.len(), 1);
//! assert_eq!(findings[0].deviation_score, 4.0);
//! ```
//!
//! ## Architecture
//!
//! Handlers → [`TelemetryLog`] (the one shared, mutex-guarded state) →
//! read on demand by search and on a timer by the persistence scheduler.
//!
//! - [`anomaly`]: pure threshold scoring — record + bounds in, finding out.
//! - [`search`]: range filter + anomaly evaluation + stable sort.
//! - [`snapshot`]: little-endian binary codec for the durable checkpoint.
//! - [`persist`]: the scheduler thread driving snapshot, export, and report.
//!
//! Network handling lives in `sensorium-server`; this crate has no sockets.

pub mod anomaly;
pub mod config;
pub mod persist;
pub mod record;
pub mod search;
pub mod snapshot;
pub mod store;

pub use anomaly::{AnomalyFinding, Thresholds, evaluate, violations};
pub use config::Config;
pub use persist::{PersistConfig, PersistenceScheduler, load_snapshot_at_startup};
pub use record::{SensorRecord, TIMESTAMP_FORMAT, current_timestamp, normalize_timestamp};
pub use search::{SortKey, search};
pub use snapshot::{read_snapshot, write_snapshot};
pub use store::{InMemoryLog, TelemetryLog};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
