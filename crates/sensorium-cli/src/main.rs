//! CLI for sensorium — a small observatory for environment sensors.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sensorium")]
#[command(about = "sensorium — streamed environment telemetry over TCP")]
#[command(version = sensorium_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the telemetry server
    Serve {
        /// Listen host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Listen port
        #[arg(long, default_value_t = 9999)]
        port: u16,

        /// Receive buffer size per connection, in bytes
        #[arg(long, default_value_t = 4096)]
        recv_buffer: usize,

        /// Binary snapshot file (loaded at startup, rewritten periodically)
        #[arg(long, default_value = "sensor_data.bin")]
        snapshot_path: PathBuf,

        /// Directory receiving timestamped JSON export files
        #[arg(long, default_value = ".")]
        export_dir: PathBuf,

        /// Seconds between binary snapshot writes
        #[arg(long, default_value_t = 60)]
        snapshot_interval: u64,

        /// Seconds between JSON export drains
        #[arg(long, default_value_t = 300)]
        export_interval: u64,

        /// Seconds between logged historical anomaly reports
        #[arg(long, default_value_t = 60)]
        report_interval: u64,

        /// Refuse connections beyond this many concurrent sessions
        #[arg(long)]
        max_connections: Option<usize>,

        /// Temperature bounds, degrees C
        #[arg(long, default_value_t = 20.0)]
        temp_min: f64,
        #[arg(long, default_value_t = 26.0)]
        temp_max: f64,

        /// Humidity bounds, percent
        #[arg(long, default_value_t = 40.0)]
        humidity_min: f64,
        #[arg(long, default_value_t = 60.0)]
        humidity_max: f64,

        /// Light bounds, lux
        #[arg(long, default_value_t = 300.0)]
        light_min: f64,
        #[arg(long, default_value_t = 800.0)]
        light_max: f64,
    },

    /// Send synthetic sensor readings to a running server
    Simulate {
        /// Server host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(long, default_value_t = 9999)]
        port: u16,

        /// Sensor id reported with each reading
        #[arg(long, default_value = "sim-sensor")]
        sensor_id: String,

        /// Number of readings to send (0 = until Ctrl+C)
        #[arg(long, default_value_t = 0)]
        count: u64,

        /// Seconds between readings
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Probability of injecting an out-of-range temperature excursion
        #[arg(long, default_value_t = 0.1)]
        anomaly_rate: f64,
    },

    /// Fetch every stored record and sort it client-side
    Fetch {
        /// Server host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(long, default_value_t = 9999)]
        port: u16,

        /// Sort field
        #[arg(long, default_value = "timestamp",
              value_parser = ["timestamp", "temperature", "humidity", "light", "sensor_id"])]
        sort_by: String,

        /// Sort descending instead of ascending
        #[arg(long)]
        descending: bool,

        /// Maximum rows to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Search a binary snapshot file for historical anomalies
    Search {
        /// Snapshot file to search
        #[arg(long, default_value = "sensor_data.bin")]
        file: PathBuf,

        /// Inclusive range start (canonical timestamp; empty = unbounded)
        #[arg(long, default_value = "")]
        start: String,

        /// Inclusive range end (canonical timestamp; empty = unbounded)
        #[arg(long, default_value = "")]
        end: String,

        /// Sort key
        #[arg(long, default_value = "deviation", value_parser = ["timestamp", "deviation"])]
        sort_by: String,

        /// Sort descending instead of ascending
        #[arg(long)]
        descending: bool,

        /// Temperature bounds, degrees C
        #[arg(long, default_value_t = 20.0)]
        temp_min: f64,
        #[arg(long, default_value_t = 26.0)]
        temp_max: f64,

        /// Humidity bounds, percent
        #[arg(long, default_value_t = 40.0)]
        humidity_min: f64,
        #[arg(long, default_value_t = 60.0)]
        humidity_max: f64,

        /// Light bounds, lux
        #[arg(long, default_value_t = 300.0)]
        light_min: f64,
        #[arg(long, default_value_t = 800.0)]
        light_max: f64,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            recv_buffer,
            snapshot_path,
            export_dir,
            snapshot_interval,
            export_interval,
            report_interval,
            max_connections,
            temp_min,
            temp_max,
            humidity_min,
            humidity_max,
            light_min,
            light_max,
        } => {
            let config = sensorium_core::Config {
                host,
                port,
                recv_buffer_size: recv_buffer,
                snapshot_interval: std::time::Duration::from_secs(snapshot_interval),
                export_interval: std::time::Duration::from_secs(export_interval),
                report_interval: std::time::Duration::from_secs(report_interval),
                snapshot_path,
                export_dir,
                max_connections,
                thresholds: sensorium_core::Thresholds {
                    temp_min,
                    temp_max,
                    humidity_min,
                    humidity_max,
                    light_min,
                    light_max,
                },
                ..sensorium_core::Config::default()
            };
            commands::serve::run(config);
        }

        Commands::Simulate {
            host,
            port,
            sensor_id,
            count,
            interval,
            anomaly_rate,
        } => commands::simulate::run(&host, port, &sensor_id, count, interval, anomaly_rate),

        Commands::Fetch {
            host,
            port,
            sort_by,
            descending,
            limit,
        } => commands::fetch::run(&host, port, &sort_by, descending, limit),

        Commands::Search {
            file,
            start,
            end,
            sort_by,
            descending,
            temp_min,
            temp_max,
            humidity_min,
            humidity_max,
            light_min,
            light_max,
        } => {
            let thresholds = sensorium_core::Thresholds {
                temp_min,
                temp_max,
                humidity_min,
                humidity_max,
                light_min,
                light_max,
            };
            commands::search::run(&file, &start, &end, &sort_by, descending, &thresholds);
        }
    }
}
