//! Threshold-based anomaly scoring.
//!
//! **ALL** threshold logic lives here — no other module compares a reading
//! against a bound. [`evaluate`] is the single gateway: a pure function from
//! record + thresholds to a finding. [`violations`] is a thin projection of
//! the same evaluation for call sites that only want the warning text; it
//! must never grow its own comparison logic, or the two views drift.
//!
//! Scoring: each of the three metrics is checked in a fixed order
//! (temperature, humidity, light). A value below the minimum contributes
//! `min - value` to the deviation score, a value above the maximum
//! contributes `value - max`, and an in-range value (bounds inclusive)
//! contributes nothing. The score is therefore non-negative and zero exactly
//! when the record is normal.

use serde::{Deserialize, Serialize};

use crate::record::SensorRecord;

/// Normal operating bounds for the three metrics.
///
/// Constructed once at startup and passed by reference into every component
/// that scores readings — never a global.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
    pub light_min: f64,
    pub light_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temp_min: 20.0,
            temp_max: 26.0,
            humidity_min: 40.0,
            humidity_max: 60.0,
            light_min: 300.0,
            light_max: 800.0,
        }
    }
}

/// Result of evaluating one record against the thresholds.
///
/// Transient: produced on demand by [`evaluate`] and historical search, never
/// persisted independently of the record it derives from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyFinding {
    pub record: SensorRecord,
    /// One warning per out-of-range metric, in fixed metric order.
    pub descriptions: Vec<String>,
    /// Sum of per-metric excursion magnitudes; 0.0 means no violation.
    pub deviation_score: f64,
}

impl AnomalyFinding {
    pub fn is_anomalous(&self) -> bool {
        !self.descriptions.is_empty()
    }
}

/// Evaluate a record against the thresholds.
pub fn evaluate(record: &SensorRecord, thresholds: &Thresholds) -> AnomalyFinding {
    // Warning text carries the timestamp without the millisecond suffix.
    let display_ts = record
        .timestamp
        .rsplit_once('.')
        .map(|(head, _)| head)
        .unwrap_or(&record.timestamp);

    struct Metric {
        label: &'static str,
        unit: &'static str,
        value: f64,
        min: f64,
        max: f64,
        decimals: usize,
    }

    let metrics = [
        Metric {
            label: "temperature",
            unit: "C",
            value: record.temperature,
            min: thresholds.temp_min,
            max: thresholds.temp_max,
            decimals: 2,
        },
        Metric {
            label: "humidity",
            unit: "%",
            value: record.humidity,
            min: thresholds.humidity_min,
            max: thresholds.humidity_max,
            decimals: 2,
        },
        Metric {
            label: "light",
            unit: "lux",
            value: record.light,
            min: thresholds.light_min,
            max: thresholds.light_max,
            decimals: 0,
        },
    ];

    let mut descriptions = Vec::new();
    let mut deviation_score = 0.0;

    for m in metrics {
        if m.value < m.min {
            descriptions.push(format!(
                "warning ({display_ts}): {} ({:.prec$} {}) below the minimum bound ({:.prec$} {})",
                m.label,
                m.value,
                m.unit,
                m.min,
                m.unit,
                prec = m.decimals,
            ));
            deviation_score += m.min - m.value;
        } else if m.value > m.max {
            descriptions.push(format!(
                "warning ({display_ts}): {} ({:.prec$} {}) above the maximum bound ({:.prec$} {})",
                m.label,
                m.value,
                m.unit,
                m.max,
                m.unit,
                prec = m.decimals,
            ));
            deviation_score += m.value - m.max;
        }
    }

    AnomalyFinding {
        record: record.clone(),
        descriptions,
        deviation_score,
    }
}

/// Warning descriptions only — a projection of [`evaluate`] for inline checks.
pub fn violations(record: &SensorRecord, thresholds: &Thresholds) -> Vec<String> {
    evaluate(record, thresholds).descriptions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(temperature: f64, humidity: f64, light: f64) -> SensorRecord {
        SensorRecord {
            timestamp: "2024-01-02T10:30:00.123Z".to_string(),
            temperature,
            humidity,
            light,
            sensor_id: "test-sensor".to_string(),
        }
    }

    #[test]
    fn in_range_record_is_normal() {
        let finding = evaluate(&record(22.0, 50.0, 500.0), &Thresholds::default());
        assert!(finding.descriptions.is_empty());
        assert_eq!(finding.deviation_score, 0.0);
        assert!(!finding.is_anomalous());
    }

    #[test]
    fn bounds_are_inclusive() {
        let thresholds = Thresholds::default();
        for reading in [
            record(20.0, 50.0, 500.0),
            record(26.0, 50.0, 500.0),
            record(22.0, 40.0, 500.0),
            record(22.0, 60.0, 500.0),
            record(22.0, 50.0, 300.0),
            record(22.0, 50.0, 800.0),
        ] {
            let finding = evaluate(&reading, &thresholds);
            assert!(
                !finding.is_anomalous(),
                "boundary value flagged: {reading:?}"
            );
        }
    }

    #[test]
    fn high_temperature_scores_the_excursion() {
        let finding = evaluate(&record(30.0, 50.0, 500.0), &Thresholds::default());
        assert_eq!(finding.descriptions.len(), 1);
        assert!(finding.descriptions[0].contains("above"));
        assert!(finding.descriptions[0].contains("temperature"));
        assert_eq!(finding.deviation_score, 4.0);
    }

    #[test]
    fn low_temperature_scores_the_excursion() {
        let finding = evaluate(&record(15.0, 50.0, 500.0), &Thresholds::default());
        assert_eq!(finding.descriptions.len(), 1);
        assert!(finding.descriptions[0].contains("below"));
        assert_eq!(finding.deviation_score, 5.0);
    }

    #[test]
    fn score_sums_independent_excursions() {
        // temp 2 below min, humidity 30 above max
        let finding = evaluate(&record(18.0, 90.0, 500.0), &Thresholds::default());
        assert_eq!(finding.descriptions.len(), 2);
        assert_eq!(finding.deviation_score, 32.0);
    }

    #[test]
    fn descriptions_keep_metric_order() {
        // Light excursion is far larger than the temperature one; order must
        // still be temperature first.
        let finding = evaluate(&record(27.0, 50.0, 5000.0), &Thresholds::default());
        assert_eq!(finding.descriptions.len(), 2);
        assert!(finding.descriptions[0].contains("temperature"));
        assert!(finding.descriptions[1].contains("light"));
    }

    #[test]
    fn warning_text_trims_milliseconds() {
        let finding = evaluate(&record(30.0, 50.0, 500.0), &Thresholds::default());
        assert!(finding.descriptions[0].contains("2024-01-02T10:30:00"));
        assert!(!finding.descriptions[0].contains(".123"));
    }

    #[test]
    fn violations_matches_evaluate() {
        let reading = record(30.0, 90.0, 100.0);
        let thresholds = Thresholds::default();
        assert_eq!(
            violations(&reading, &thresholds),
            evaluate(&reading, &thresholds).descriptions
        );
    }
}
