//! Per-connection session handler.
//!
//! Each accepted connection runs this loop on its own thread:
//! receive → decode → append → reply, until the peer closes, the transport
//! fails, or global shutdown is observed. Decode failures are answered with
//! an error reply and the connection stays open; transport failures end the
//! session and nothing else — retry, if any, is the peer's business.
//!
//! The receive call carries a short timeout so a handler parked on an idle
//! peer still observes the shutdown flag within a bounded delay.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sensorium_core::anomaly::{Thresholds, violations};
use sensorium_core::store::TelemetryLog;

use crate::protocol::{self, ClientMessage};

/// Receive timeout; bounds how long shutdown can go unobserved.
const RECV_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    conn_tag: String,
    log: Arc<dyn TelemetryLog>,
    thresholds: Thresholds,
    recv_buffer_size: usize,
    shutdown: Arc<AtomicBool>,
) {
    if let Err(e) = stream.set_read_timeout(Some(RECV_POLL_INTERVAL)) {
        log::warn!("[{conn_tag}] cannot set read timeout for {peer}: {e}");
        return;
    }

    log::info!("[{conn_tag}] connection accepted from {peer}");
    let mut buf = vec![0u8; recv_buffer_size];

    while !shutdown.load(Ordering::SeqCst) {
        let n = match stream.read(&mut buf) {
            Ok(0) => {
                log::info!("[{conn_tag}] peer {peer} closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                // Receive timeout: loop around and re-check the shutdown flag.
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                log::warn!("[{conn_tag}] connection from {peer} reset by peer");
                break;
            }
            Err(e) => {
                log::warn!("[{conn_tag}] receive error from {peer}: {e}");
                break;
            }
        };

        let raw = String::from_utf8_lossy(&buf[..n]);
        let reply = process_message(raw.trim(), &*log, &thresholds, &conn_tag);
        if let Err(e) = stream.write_all(reply.as_bytes()) {
            log::warn!("[{conn_tag}] send error to {peer}: {e}");
            break;
        }
    }

    log::info!("[{conn_tag}] session with {peer} closed");
}

/// Turn one raw inbound message into its reply, appending to the log on a
/// successful ingest. Anomaly checking here is inline logging only — it never
/// gates storage.
fn process_message(
    raw: &str,
    log: &dyn TelemetryLog,
    thresholds: &Thresholds,
    conn_tag: &str,
) -> String {
    match protocol::decode_message(raw) {
        Ok(ClientMessage::SensorData { payload }) => match payload.into_record() {
            Ok(record) => {
                for warning in violations(&record, thresholds) {
                    log::warn!("[{conn_tag}] {warning}");
                }
                log::info!(
                    "[{conn_tag}] reading stored: T={:.2} H={:.2} L={:.0} id={}",
                    record.temperature,
                    record.humidity,
                    record.light,
                    record.sensor_id
                );
                log.append(record);
                protocol::REPLY_ACK.to_string()
            }
            Err(e) => {
                log::warn!("[{conn_tag}] rejected reading: {}", e.reply());
                e.reply()
            }
        },
        Ok(ClientMessage::GetAllData) => {
            let records = log.snapshot();
            match serde_json::to_string(&records) {
                Ok(json) => {
                    log::info!("[{conn_tag}] sending {} records", records.len());
                    json
                }
                Err(e) => {
                    log::error!("[{conn_tag}] cannot serialize {} records: {e}", records.len());
                    protocol::REPLY_INTERNAL.to_string()
                }
            }
        }
        Err(e) => {
            log::warn!("[{conn_tag}] undecodable message ({:.120})", raw);
            e.reply()
        }
    }
}
