use std::path::Path;

use sensorium_core::{SortKey, Thresholds, read_snapshot, search};

pub fn run(
    file: &Path,
    start: &str,
    end: &str,
    sort_by: &str,
    descending: bool,
    thresholds: &Thresholds,
) {
    let records = match read_snapshot(file) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("error: cannot read snapshot {}: {e}", file.display());
            std::process::exit(1);
        }
    };

    let sort_key: SortKey = match sort_by.parse() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let findings = search(&records, start, end, sort_key, descending, thresholds);
    if findings.is_empty() {
        println!("no anomalies among {} records", records.len());
        return;
    }

    println!(
        "{} anomalous records among {} (by {sort_key}, {}):",
        findings.len(),
        records.len(),
        if descending { "descending" } else { "ascending" }
    );
    for finding in &findings {
        println!(
            "  {}  sensor={}  deviation={:.2}",
            finding.record.timestamp, finding.record.sensor_id, finding.deviation_score
        );
        for description in &finding.descriptions {
            println!("    - {description}");
        }
    }
}
