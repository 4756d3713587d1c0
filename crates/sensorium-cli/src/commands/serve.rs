use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sensorium_core::store::{InMemoryLog, TelemetryLog};
use sensorium_core::Config;
use sensorium_server::Server;

pub fn run(config: Config) {
    let thresholds = config.thresholds;

    println!("sensorium server v{}", sensorium_core::VERSION);
    println!("   listening on {}", config.listen_addr());
    println!("   snapshot:  {} every {:?}", config.snapshot_path.display(), config.snapshot_interval);
    println!("   exports:   {} every {:?}", config.export_dir.display(), config.export_interval);
    println!(
        "   bounds:    temp [{}, {}] C, humidity [{}, {}] %, light [{}, {}] lux",
        thresholds.temp_min,
        thresholds.temp_max,
        thresholds.humidity_min,
        thresholds.humidity_max,
        thresholds.light_min,
        thresholds.light_max
    );
    match config.max_connections {
        Some(max) => println!("   sessions:  at most {max} concurrent"),
        None => println!("   sessions:  unbounded"),
    }
    println!();
    println!("   Protocol (one JSON message per send):");
    println!(
        "     {{\"type\": \"sensor_data\", \"payload\": {{\"temperature\": .., \"humidity\": .., \"light\": ..}}}}"
    );
    println!("     {{\"type\": \"get_all_data\"}}");
    println!();
    println!("   Ctrl+C stops the server after a final snapshot and export.");
    println!();

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let log: Arc<dyn TelemetryLog> = Arc::new(InMemoryLog::new());
    let addr = config.listen_addr();
    let server = match Server::bind(config, log) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("error: cannot bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run(shutdown) {
        eprintln!("error: server failed: {e}");
        std::process::exit(1);
    }
    println!("server stopped");
}
