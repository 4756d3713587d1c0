//! Integration tests for sensorium-core.
//!
//! These tests verify the full telemetry pipeline:
//! ingest → shared log → anomaly search, and log → scheduler → disk → reload.

use std::sync::Arc;

use sensorium_core::persist::{PersistConfig, PersistenceScheduler, load_snapshot_at_startup};
use sensorium_core::{InMemoryLog, SensorRecord, SortKey, TelemetryLog, Thresholds, search};

fn reading(ts: &str, temperature: f64, humidity: f64, light: f64) -> SensorRecord {
    SensorRecord {
        timestamp: ts.to_string(),
        temperature,
        humidity,
        light,
        sensor_id: "it-sensor".to_string(),
    }
}

#[test]
fn three_record_ingest_orders_by_deviation() {
    let log = InMemoryLog::new();
    log.append(reading("2024-01-02T10:00:00.000Z", 22.0, 50.0, 500.0)); // normal
    log.append(reading("2024-01-02T10:01:00.000Z", 30.0, 50.0, 500.0)); // temp high, score 4
    log.append(reading("2024-01-02T10:02:00.000Z", 18.0, 90.0, 500.0)); // temp low + humidity high, score 32

    let findings = search(
        &log.snapshot(),
        "",
        "",
        SortKey::Deviation,
        true,
        &Thresholds::default(),
    );

    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].record.timestamp, "2024-01-02T10:02:00.000Z");
    assert_eq!(findings[0].deviation_score, 32.0);
    assert_eq!(findings[1].record.timestamp, "2024-01-02T10:01:00.000Z");
    assert_eq!(findings[1].deviation_score, 4.0);
}

#[test]
fn search_window_is_inclusive_and_excludes_the_next_day() {
    let log = InMemoryLog::new();
    log.append(reading("2024-01-02T00:00:00.000Z", 30.0, 50.0, 500.0));
    log.append(reading("2024-01-03T00:00:00.000Z", 30.0, 50.0, 500.0));

    let findings = search(
        &log.snapshot(),
        "2024-01-02T00:00:00.000Z",
        "2024-01-02T23:59:59.999Z",
        SortKey::Timestamp,
        false,
        &Thresholds::default(),
    );

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].record.timestamp, "2024-01-02T00:00:00.000Z");
}

#[test]
fn scheduler_persists_and_a_new_store_recovers() {
    let tmp = tempfile::tempdir().unwrap();
    let snapshot_path = tmp.path().join("sensor_data.bin");

    let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
    log.append(reading("2024-01-02T10:00:00.000Z", 22.0, 50.0, 500.0));
    log.append(reading("2024-01-02T10:01:00.000Z", 30.0, 50.0, 500.0));

    let config = PersistConfig {
        snapshot_path: snapshot_path.clone(),
        export_dir: tmp.path().to_path_buf(),
        ..PersistConfig::default()
    };
    let mut scheduler = PersistenceScheduler::new(Arc::clone(&log), Thresholds::default(), config);
    scheduler.save_snapshot(true);
    scheduler.export_batch(true);

    // A fresh process: load the checkpoint, see the same records.
    let recovered = InMemoryLog::new();
    load_snapshot_at_startup(&recovered, &snapshot_path);
    assert_eq!(recovered.snapshot(), log.snapshot());

    // Nothing new since the drain: a second forced export writes no file.
    let before: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    scheduler.export_batch(true);
    let after: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
    assert_eq!(before.len(), after.len());
}
