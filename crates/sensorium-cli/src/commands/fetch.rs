use std::io::{Read, Write};

use sensorium_core::SensorRecord;

pub fn run(host: &str, port: u16, sort_by: &str, descending: bool, limit: usize) {
    let mut stream = match super::connect(host, port) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot connect to {host}:{port}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = stream.write_all(br#"{"type":"get_all_data"}"#) {
        eprintln!("error: request failed: {e}");
        std::process::exit(1);
    }

    // The reply is one JSON array, possibly spanning several reads; keep
    // reading until it parses or the stream goes quiet.
    let mut data = Vec::new();
    let mut buf = [0u8; 65536];
    let mut records: Option<Vec<SensorRecord>> = None;
    loop {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                data.extend_from_slice(&buf[..n]);
                if let Ok(parsed) = serde_json::from_slice::<Vec<SensorRecord>>(&data) {
                    records = Some(parsed);
                    break;
                }
            }
            Err(e) => {
                if records.is_none() && data.is_empty() {
                    eprintln!("error: no reply from server: {e}");
                    std::process::exit(1);
                }
                break;
            }
        }
    }

    let mut records = match records {
        Some(records) => records,
        None => {
            eprintln!(
                "error: server reply is not a record array: {}",
                String::from_utf8_lossy(&data)
            );
            std::process::exit(1);
        }
    };

    sort_records(&mut records, sort_by, descending);

    let order = if descending { "descending" } else { "ascending" };
    println!("{} records, sorted by {sort_by} ({order}):", records.len());
    for record in records.iter().take(limit) {
        println!(
            "  id={:<16} ts={} T={:.2} C H={:.2} % L={:.0} lux",
            record.sensor_id, record.timestamp, record.temperature, record.humidity, record.light
        );
    }
    if records.len() > limit {
        println!("  ... and {} more", records.len() - limit);
    }
}

/// Stable client-side sort over a fetched record array.
fn sort_records(records: &mut [SensorRecord], sort_by: &str, descending: bool) {
    records.sort_by(|a, b| {
        let ord = match sort_by {
            "temperature" => a.temperature.total_cmp(&b.temperature),
            "humidity" => a.humidity.total_cmp(&b.humidity),
            "light" => a.light.total_cmp(&b.light),
            "sensor_id" => a.sensor_id.cmp(&b.sensor_id),
            // clap restricts the value; anything else falls back to timestamp.
            _ => a.timestamp.cmp(&b.timestamp),
        };
        if descending { ord.reverse() } else { ord }
    });
}
