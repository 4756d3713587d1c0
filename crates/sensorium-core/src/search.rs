//! Historical anomaly search over a store snapshot.
//!
//! Filters records by an inclusive timestamp range, evaluates each survivor
//! with the anomaly engine, and returns the violating ones sorted by a
//! selectable key. The search never touches the live store — callers pass in
//! a snapshot, so no lock is held while scoring.

use std::str::FromStr;

use crate::anomaly::{self, AnomalyFinding, Thresholds};
use crate::record::SensorRecord;

/// Sort key for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Lexicographic timestamp order (chronological under the canonical
    /// timestamp format).
    Timestamp,
    /// Numeric deviation score order.
    Deviation,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timestamp" => Ok(Self::Timestamp),
            "deviation" => Ok(Self::Deviation),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timestamp => write!(f, "timestamp"),
            Self::Deviation => write!(f, "deviation"),
        }
    }
}

/// Find threshold-violating records in `[start, end]`, sorted by `sort_key`.
///
/// An empty `start` or `end` leaves that side of the range unbounded; both
/// bounds are inclusive. Timestamps are compared lexicographically, which is
/// chronologically correct **only** because every stored timestamp uses the
/// single fixed-width canonical format (see [`crate::record`]). That is a
/// hard precondition of this function, not an implementation detail.
///
/// The sort is stable: records with equal keys keep their snapshot
/// (insertion) order, so results are deterministic.
pub fn search(
    records: &[SensorRecord],
    start: &str,
    end: &str,
    sort_key: SortKey,
    descending: bool,
    thresholds: &Thresholds,
) -> Vec<AnomalyFinding> {
    let mut findings: Vec<AnomalyFinding> = records
        .iter()
        .filter(|r| start.is_empty() || r.timestamp.as_str() >= start)
        .filter(|r| end.is_empty() || r.timestamp.as_str() <= end)
        .map(|r| anomaly::evaluate(r, thresholds))
        .filter(AnomalyFinding::is_anomalous)
        .collect();

    match sort_key {
        SortKey::Timestamp => findings.sort_by(|a, b| {
            let ord = a.record.timestamp.cmp(&b.record.timestamp);
            if descending { ord.reverse() } else { ord }
        }),
        SortKey::Deviation => findings.sort_by(|a, b| {
            let ord = a.deviation_score.total_cmp(&b.deviation_score);
            if descending { ord.reverse() } else { ord }
        }),
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: &str, temperature: f64, sensor_id: &str) -> SensorRecord {
        SensorRecord {
            timestamp: ts.to_string(),
            temperature,
            humidity: 50.0,
            light: 500.0,
            sensor_id: sensor_id.to_string(),
        }
    }

    #[test]
    fn normal_records_are_dropped() {
        let records = vec![
            record("2024-01-02T10:00:00.000Z", 22.0, "a"),
            record("2024-01-02T11:00:00.000Z", 30.0, "b"),
        ];
        let found = search(
            &records,
            "",
            "",
            SortKey::Timestamp,
            false,
            &Thresholds::default(),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].record.sensor_id, "b");
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let records = vec![
            record("2024-01-02T00:00:00.000Z", 30.0, "at-start"),
            record("2024-01-02T12:00:00.000Z", 30.0, "inside"),
            record("2024-01-03T00:00:00.000Z", 30.0, "past-end"),
        ];
        let found = search(
            &records,
            "2024-01-02T00:00:00.000Z",
            "2024-01-02T23:59:59.999Z",
            SortKey::Timestamp,
            false,
            &Thresholds::default(),
        );
        let ids: Vec<&str> = found.iter().map(|f| f.record.sensor_id.as_str()).collect();
        assert_eq!(ids, ["at-start", "inside"]);
    }

    #[test]
    fn empty_bounds_are_unbounded() {
        let records = vec![
            record("2020-01-01T00:00:00.000Z", 30.0, "old"),
            record("2030-01-01T00:00:00.000Z", 30.0, "future"),
        ];
        let found = search(
            &records,
            "",
            "",
            SortKey::Timestamp,
            false,
            &Thresholds::default(),
        );
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn deviation_descending_is_non_increasing() {
        let records = vec![
            record("2024-01-02T10:00:00.000Z", 28.0, "a"), // score 2
            record("2024-01-02T10:01:00.000Z", 35.0, "b"), // score 9
            record("2024-01-02T10:02:00.000Z", 15.0, "c"), // score 5
            record("2024-01-02T10:03:00.000Z", 31.0, "d"), // score 5
        ];
        let found = search(
            &records,
            "",
            "",
            SortKey::Deviation,
            true,
            &Thresholds::default(),
        );
        let scores: Vec<f64> = found.iter().map(|f| f.deviation_score).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] >= pair[1], "not non-increasing: {scores:?}");
        }
    }

    #[test]
    fn equal_scores_keep_snapshot_order() {
        let records = vec![
            record("2024-01-02T10:05:00.000Z", 30.0, "first"),
            record("2024-01-02T10:01:00.000Z", 30.0, "second"),
            record("2024-01-02T10:03:00.000Z", 30.0, "third"),
        ];
        let found = search(
            &records,
            "",
            "",
            SortKey::Deviation,
            true,
            &Thresholds::default(),
        );
        let ids: Vec<&str> = found.iter().map(|f| f.record.sensor_id.as_str()).collect();
        assert_eq!(ids, ["first", "second", "third"]);
    }

    #[test]
    fn timestamp_sort_both_directions() {
        let records = vec![
            record("2024-01-02T10:03:00.000Z", 30.0, "late"),
            record("2024-01-02T10:01:00.000Z", 30.0, "early"),
        ];
        let asc = search(
            &records,
            "",
            "",
            SortKey::Timestamp,
            false,
            &Thresholds::default(),
        );
        assert_eq!(asc[0].record.sensor_id, "early");
        let desc = search(
            &records,
            "",
            "",
            SortKey::Timestamp,
            true,
            &Thresholds::default(),
        );
        assert_eq!(desc[0].record.sensor_id, "late");
    }

    #[test]
    fn sort_key_parses_from_cli_strings() {
        assert_eq!("timestamp".parse::<SortKey>().unwrap(), SortKey::Timestamp);
        assert_eq!("deviation".parse::<SortKey>().unwrap(), SortKey::Deviation);
        assert!("severity".parse::<SortKey>().is_err());
    }
}
