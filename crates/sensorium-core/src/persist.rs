//! Periodic persistence scheduler.
//!
//! One dedicated thread runs [`PersistenceScheduler::run`]: a 1-second tick
//! loop that re-checks the shutdown flag between ticks and drives three
//! independently-timed actions against the shared log:
//!
//! - **Binary snapshot** (full replace): the durable checkpoint used for
//!   recovery at startup.
//! - **Structured export** (delta): drains the pending batch to a new
//!   timestamped JSON file. Exports are human-inspectable deltas; snapshots
//!   are the full-state checkpoint. The asymmetry is intentional.
//! - **Anomaly report**: logs the worst historical findings by deviation.
//!
//! A failed write is logged and skipped; in-memory state is never altered by
//! a persistence failure, and the action runs again at its next scheduled
//! tick. On shutdown the scheduler performs one final forced export and
//! snapshot before returning.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::anomaly::Thresholds;
use crate::config::{Config, EXPORT_FILE_PREFIX, EXPORT_FILE_SUFFIX};
use crate::record::current_timestamp;
use crate::search::{self, SortKey};
use crate::snapshot;
use crate::store::TelemetryLog;

/// How many findings the periodic anomaly report logs before truncating.
const REPORT_LIMIT: usize = 5;

/// Scheduler timing and destinations.
#[derive(Debug, Clone)]
pub struct PersistConfig {
    pub snapshot_path: PathBuf,
    pub export_dir: PathBuf,
    pub export_prefix: String,
    pub export_suffix: String,
    pub snapshot_interval: Duration,
    pub export_interval: Duration,
    pub report_interval: Duration,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PersistConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            snapshot_path: config.snapshot_path.clone(),
            export_dir: config.export_dir.clone(),
            export_prefix: EXPORT_FILE_PREFIX.to_string(),
            export_suffix: EXPORT_FILE_SUFFIX.to_string(),
            snapshot_interval: config.snapshot_interval,
            export_interval: config.export_interval,
            report_interval: config.report_interval,
        }
    }
}

/// Interval-gated persistence driver for one [`TelemetryLog`].
pub struct PersistenceScheduler {
    log: Arc<dyn TelemetryLog>,
    thresholds: Thresholds,
    config: PersistConfig,
    last_snapshot: Instant,
    last_export: Instant,
    last_report: Instant,
}

impl PersistenceScheduler {
    pub fn new(log: Arc<dyn TelemetryLog>, thresholds: Thresholds, config: PersistConfig) -> Self {
        let now = Instant::now();
        Self {
            log,
            thresholds,
            config,
            last_snapshot: now,
            last_export: now,
            last_report: now,
        }
    }

    /// Write the full-store binary snapshot if the interval has elapsed (or
    /// unconditionally when `force`). The timer advances even when the write
    /// fails: the retry happens at the next scheduled tick, not in a hot loop.
    pub fn save_snapshot(&mut self, force: bool) {
        if !force && self.last_snapshot.elapsed() < self.config.snapshot_interval {
            return;
        }
        self.last_snapshot = Instant::now();

        let records = self.log.snapshot();
        match snapshot::write_snapshot(&self.config.snapshot_path, &records) {
            Ok(()) => log::info!(
                "snapshot: wrote {} records to {}",
                records.len(),
                self.config.snapshot_path.display()
            ),
            Err(e) => log::error!(
                "snapshot: cannot write {}: {e}; skipping this tick",
                self.config.snapshot_path.display()
            ),
        }
    }

    /// Drain the pending export batch to a timestamped JSON file if the
    /// interval has elapsed (or unconditionally when `force`). An empty batch
    /// writes no file but still advances the timer.
    pub fn export_batch(&mut self, force: bool) {
        if !force && self.last_export.elapsed() < self.config.export_interval {
            return;
        }
        self.last_export = Instant::now();

        let batch = self.log.drain_export_batch();
        if batch.is_empty() {
            log::debug!("export: no new records since the last drain");
            return;
        }

        let path = self.export_path();
        let json = match serde_json::to_string_pretty(&batch) {
            Ok(json) => json,
            Err(e) => {
                log::error!("export: cannot serialize batch: {e}");
                return;
            }
        };
        match fs::write(&path, json) {
            Ok(()) => log::info!("export: wrote {} records to {}", batch.len(), path.display()),
            // The drained records stay in the main log and the next snapshot;
            // this export cycle was their at-most-once delivery.
            Err(e) => log::error!("export: cannot write {}: {e}", path.display()),
        }
    }

    /// Log the worst historical anomalies by deviation, on its own interval.
    pub fn report_anomalies(&mut self) {
        if self.last_report.elapsed() < self.config.report_interval {
            return;
        }
        self.last_report = Instant::now();

        let records = self.log.snapshot();
        let findings = search::search(&records, "", "", SortKey::Deviation, true, &self.thresholds);
        if findings.is_empty() {
            log::info!("report: no historical anomalies in {} records", records.len());
            return;
        }

        log::warn!(
            "report: {} anomalous records among {} (worst first)",
            findings.len(),
            records.len()
        );
        for finding in findings.iter().take(REPORT_LIMIT) {
            log::warn!(
                "report: {} sensor={} deviation={:.2}",
                finding.record.timestamp,
                finding.record.sensor_id,
                finding.deviation_score
            );
        }
        if findings.len() > REPORT_LIMIT {
            log::warn!("report: ... and {} more", findings.len() - REPORT_LIMIT);
        }
    }

    /// Tick loop. Returns after a final forced export + snapshot once the
    /// shutdown flag is observed.
    pub fn run(mut self, shutdown: &AtomicBool) {
        log::info!(
            "persistence scheduler started (snapshot every {:?}, export every {:?})",
            self.config.snapshot_interval,
            self.config.export_interval
        );
        while !shutdown.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_secs(1));
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            self.save_snapshot(false);
            self.export_batch(false);
            self.report_anomalies();
        }

        log::info!("persistence scheduler stopping, flushing state");
        self.export_batch(true);
        self.save_snapshot(true);
    }

    fn export_path(&self) -> PathBuf {
        let stamp = sanitize_for_filename(&current_timestamp());
        self.config.export_dir.join(format!(
            "{}{}{}",
            self.config.export_prefix, stamp, self.config.export_suffix
        ))
    }
}

/// Load the snapshot file into the store at startup.
///
/// A missing file is normal (first run). A file that fails to decode is a
/// real data-loss event: the partial load is discarded, the store starts
/// empty, and the loss is surfaced loudly rather than "best-effort" hidden.
pub fn load_snapshot_at_startup(log: &dyn TelemetryLog, path: &std::path::Path) {
    if !path.exists() {
        log::info!(
            "no snapshot at {}; starting with an empty store",
            path.display()
        );
        return;
    }
    match snapshot::read_snapshot(path) {
        Ok(records) => {
            log::info!("loaded {} records from {}", records.len(), path.display());
            log.load(records);
        }
        Err(e) => {
            log::warn!(
                "snapshot {} is unreadable ({e}); starting with an empty store — \
                 previously persisted records are NOT recovered",
                path.display()
            );
        }
    }
}

/// Replace characters that are unsafe in file names (`:` and `.` from the
/// canonical timestamp format).
fn sanitize_for_filename(timestamp: &str) -> String {
    timestamp
        .chars()
        .map(|c| match c {
            ':' => '-',
            '.' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SensorRecord;
    use crate::store::InMemoryLog;

    fn record(n: usize) -> SensorRecord {
        SensorRecord {
            timestamp: format!("2024-01-02T10:30:{:02}.000Z", n % 60),
            temperature: 30.0,
            humidity: 50.0,
            light: 500.0,
            sensor_id: format!("sensor-{n}"),
        }
    }

    fn scheduler_in(dir: &std::path::Path, log: Arc<dyn TelemetryLog>) -> PersistenceScheduler {
        let config = PersistConfig {
            snapshot_path: dir.join("sensor_data.bin"),
            export_dir: dir.to_path_buf(),
            ..PersistConfig::default()
        };
        PersistenceScheduler::new(log, Thresholds::default(), config)
    }

    fn export_files(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(EXPORT_FILE_PREFIX) && n.ends_with(EXPORT_FILE_SUFFIX))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn sanitize_replaces_colons_and_dots() {
        assert_eq!(
            sanitize_for_filename("2024-01-02T10:30:00.123Z"),
            "2024-01-02T10-30-00_123Z"
        );
    }

    #[test]
    fn forced_snapshot_round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
        log.append(record(0));
        log.append(record(1));

        let mut scheduler = scheduler_in(tmp.path(), Arc::clone(&log));
        scheduler.save_snapshot(true);

        let restored = InMemoryLog::new();
        load_snapshot_at_startup(&restored, &tmp.path().join("sensor_data.bin"));
        assert_eq!(restored.snapshot(), log.snapshot());
    }

    #[test]
    fn unforced_actions_respect_their_intervals() {
        let tmp = tempfile::tempdir().unwrap();
        let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
        log.append(record(0));

        // Default intervals are 60s/300s; an immediate unforced tick is a no-op.
        let mut scheduler = scheduler_in(tmp.path(), Arc::clone(&log));
        scheduler.save_snapshot(false);
        scheduler.export_batch(false);

        assert!(!tmp.path().join("sensor_data.bin").exists());
        assert!(export_files(tmp.path()).is_empty());
        assert_eq!(log.drain_export_batch().len(), 1, "batch must be untouched");
    }

    #[test]
    fn forced_export_writes_one_timestamped_file() {
        let tmp = tempfile::tempdir().unwrap();
        let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
        log.append(record(0));

        let mut scheduler = scheduler_in(tmp.path(), Arc::clone(&log));
        scheduler.export_batch(true);

        let files = export_files(tmp.path());
        assert_eq!(files.len(), 1);

        let body = fs::read_to_string(tmp.path().join(&files[0])).unwrap();
        let exported: Vec<SensorRecord> = serde_json::from_str(&body).unwrap();
        assert_eq!(exported, vec![record(0)]);
        // Pretty-printed array of field-named objects.
        assert!(body.contains("\"sensor_id\""));
        assert!(body.contains('\n'));
    }

    #[test]
    fn empty_batch_export_writes_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
        let mut scheduler = scheduler_in(tmp.path(), log);
        scheduler.export_batch(true);
        assert!(export_files(tmp.path()).is_empty());
    }

    #[test]
    fn export_is_a_delta_not_a_full_dump() {
        let tmp = tempfile::tempdir().unwrap();
        let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
        let mut scheduler = scheduler_in(tmp.path(), Arc::clone(&log));

        log.append(record(0));
        scheduler.export_batch(true);
        // File names embed a millisecond timestamp; keep the two drains in
        // distinct milliseconds.
        std::thread::sleep(Duration::from_millis(5));
        log.append(record(1));
        scheduler.export_batch(true);

        let files = export_files(tmp.path());
        assert_eq!(files.len(), 2, "each drain produces its own file: {files:?}");
        let last = fs::read_to_string(tmp.path().join(files.last().unwrap())).unwrap();
        let exported: Vec<SensorRecord> = serde_json::from_str(&last).unwrap();
        assert_eq!(exported, vec![record(1)]);
    }

    #[test]
    fn snapshot_write_failure_leaves_memory_intact() {
        let tmp = tempfile::tempdir().unwrap();
        let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
        log.append(record(0));

        let config = PersistConfig {
            // Destination directory does not exist; File::create fails.
            snapshot_path: tmp.path().join("missing").join("sensor_data.bin"),
            export_dir: tmp.path().to_path_buf(),
            ..PersistConfig::default()
        };
        let mut scheduler =
            PersistenceScheduler::new(Arc::clone(&log), Thresholds::default(), config);
        scheduler.save_snapshot(true);

        assert_eq!(log.len(), 1);
    }

    #[test]
    fn corrupt_snapshot_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sensor_data.bin");
        fs::write(&path, b"\x02\x00\x00").unwrap();

        let log = InMemoryLog::new();
        load_snapshot_at_startup(&log, &path);
        assert!(log.is_empty());
    }

    #[test]
    fn missing_snapshot_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let log = InMemoryLog::new();
        load_snapshot_at_startup(&log, &tmp.path().join("sensor_data.bin"));
        assert!(log.is_empty());
    }

    #[test]
    fn run_flushes_on_shutdown() {
        let tmp = tempfile::tempdir().unwrap();
        let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
        log.append(record(0));

        let scheduler = scheduler_in(tmp.path(), Arc::clone(&log));
        let shutdown = AtomicBool::new(true);
        scheduler.run(&shutdown);

        assert!(tmp.path().join("sensor_data.bin").exists());
        assert_eq!(export_files(tmp.path()).len(), 1);
    }
}
