use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;

/// Delay before reconnecting after a transport failure.
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub fn run(
    host: &str,
    port: u16,
    sensor_id: &str,
    count: u64,
    interval_secs: u64,
    anomaly_rate: f64,
) {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    println!("simulating sensor {sensor_id} -> {host}:{port}");
    if count == 0 {
        println!("  sending every {interval_secs}s until Ctrl+C");
    } else {
        println!("  sending {count} readings, one every {interval_secs}s");
    }
    println!();

    let mut rng = rand::rng();
    let mut stream: Option<TcpStream> = None;
    let mut sent = 0u64;
    let mut reply_buf = [0u8; 4096];

    while running.load(Ordering::SeqCst) && (count == 0 || sent < count) {
        if stream.is_none() {
            match super::connect(host, port) {
                Ok(s) => {
                    println!("[{sensor_id}] connected");
                    stream = Some(s);
                }
                Err(e) => {
                    eprintln!("[{sensor_id}] cannot connect to {host}:{port}: {e}; retrying");
                    std::thread::sleep(RETRY_DELAY);
                    continue;
                }
            }
        }

        let message = generate_reading(&mut rng, sensor_id, anomaly_rate);
        let s = stream.as_mut().unwrap();
        if let Err(e) = s.write_all(message.as_bytes()) {
            eprintln!("[{sensor_id}] send failed: {e}; reconnecting");
            stream = None;
            continue;
        }
        match s.read(&mut reply_buf) {
            Ok(0) => {
                eprintln!("[{sensor_id}] server closed the connection; reconnecting");
                stream = None;
                continue;
            }
            Ok(n) => {
                let reply = String::from_utf8_lossy(&reply_buf[..n]);
                println!("[{sensor_id}] server: {reply}");
            }
            Err(e) => {
                eprintln!("[{sensor_id}] no reply: {e}; reconnecting");
                stream = None;
                continue;
            }
        }

        sent += 1;
        if running.load(Ordering::SeqCst) && (count == 0 || sent < count) {
            std::thread::sleep(Duration::from_secs(interval_secs));
        }
    }

    println!("[{sensor_id}] done, sent {sent} readings");
}

/// One synthetic reading as a wire message. Normal values sit comfortably in
/// range; with probability `anomaly_rate` the temperature is pushed out of
/// range (and humidity at half that rate), so a watching server has
/// something to flag.
fn generate_reading(rng: &mut impl Rng, sensor_id: &str, anomaly_rate: f64) -> String {
    let mut temperature = rng.random_range(22.0..25.0) + rng.random_range(-1.0..1.0);
    let mut humidity = rng.random_range(45.0..55.0) + rng.random_range(-5.0..5.0);
    let light = rng.random_range(400.0..700.0) + rng.random_range(-50.0..50.0);

    if rng.random::<f64>() < anomaly_rate {
        temperature = if rng.random::<f64>() < 0.5 {
            rng.random_range(28.0..35.0)
        } else {
            rng.random_range(15.0..19.0)
        };
    }
    if rng.random::<f64>() < anomaly_rate / 2.0 {
        humidity = if rng.random::<f64>() < 0.5 {
            rng.random_range(70.0..90.0)
        } else {
            rng.random_range(20.0..30.0)
        };
    }

    serde_json::json!({
        "type": "sensor_data",
        "payload": {
            "timestamp": sensorium_core::current_timestamp(),
            "temperature": temperature,
            "humidity": humidity,
            "light": light,
            "sensor_id": sensor_id,
        }
    })
    .to_string()
}
