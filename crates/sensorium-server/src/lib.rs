//! # sensorium-server
//!
//! TCP connection supervisor for the telemetry service.
//!
//! ## Architecture
//!
//! ```text
//! clients ──▶ accept loop ──▶ handler thread per session ──▶ TelemetryLog
//!                 │                                              ▲
//!                 └── shutdown flag ──▶ persistence thread ──────┘
//! ```
//!
//! One OS thread per accepted connection, one dedicated persistence thread,
//! and the accept loop itself — all coordinating through the store's own
//! mutual exclusion and a single shared shutdown flag. The accept loop polls
//! a nonblocking listener on a 1-second cadence so the flag is re-checked
//! between accepts; handlers re-check it on their receive timeout.
//!
//! Shutdown sequence: flag set → accept loop exits → handlers drain as their
//! loops observe the flag or their peers disconnect → the persistence thread
//! performs one final forced export and snapshot → all threads are joined.
//!
//! Cancellation is cooperative only; nothing is interrupted mid-operation.

pub mod protocol;

mod handler;

use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use uuid::Uuid;

use sensorium_core::config::Config;
use sensorium_core::persist::{PersistConfig, PersistenceScheduler, load_snapshot_at_startup};
use sensorium_core::store::TelemetryLog;

/// Bounded wait between accept attempts; bounds shutdown latency of the
/// accept loop.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How many concurrent sessions the supervisor admits.
///
/// An explicit policy rather than an accident of the threading model:
/// `Unbounded` is the thread-per-connection baseline, `Bounded` refuses the
/// connection with [`protocol::REPLY_BUSY`] once the bound is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    Unbounded,
    Bounded(usize),
}

impl ConcurrencyPolicy {
    fn admits(&self, active: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(max) => active < *max,
        }
    }
}

impl From<Option<usize>> for ConcurrencyPolicy {
    fn from(max_connections: Option<usize>) -> Self {
        match max_connections {
            Some(max) => Self::Bounded(max),
            None => Self::Unbounded,
        }
    }
}

impl std::fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbounded => write!(f, "unbounded"),
            Self::Bounded(max) => write!(f, "bounded({max})"),
        }
    }
}

/// A bound-but-not-yet-running telemetry server.
///
/// Binding is separated from running so callers learn the actual listen
/// address (port 0 binds an ephemeral port) and so bind failure — the only
/// process-fatal error in the system — surfaces before any traffic.
pub struct Server {
    listener: TcpListener,
    config: Config,
    log: Arc<dyn TelemetryLog>,
}

impl Server {
    /// Bind the listener. Fails only on bind/listen errors, which callers
    /// should treat as fatal.
    pub fn bind(config: Config, log: Arc<dyn TelemetryLog>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr())?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            config,
            log,
        })
    }

    /// The address the listener actually bound.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run until the shutdown flag is set, then drain and join everything.
    ///
    /// Loads the snapshot into the store, spawns the persistence thread, and
    /// enters the accept loop. Returns once all handler threads and the
    /// persistence thread have been joined.
    pub fn run(self, shutdown: Arc<AtomicBool>) -> io::Result<()> {
        load_snapshot_at_startup(&*self.log, &self.config.snapshot_path);

        let scheduler = PersistenceScheduler::new(
            Arc::clone(&self.log),
            self.config.thresholds,
            PersistConfig::from_config(&self.config),
        );
        let persist_shutdown = Arc::clone(&shutdown);
        let persist_thread = thread::Builder::new()
            .name("persistence".to_string())
            .spawn(move || scheduler.run(&persist_shutdown))?;

        let policy = ConcurrencyPolicy::from(self.config.max_connections);
        let active = Arc::new(AtomicUsize::new(0));
        let mut handlers: Vec<JoinHandle<()>> = Vec::new();

        log::info!(
            "listening on {} (admission: {policy})",
            self.local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| self.config.listen_addr())
        );

        while !shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if !policy.admits(active.load(Ordering::SeqCst)) {
                        log::warn!("refusing connection from {peer}: admission policy {policy}");
                        refuse(stream, peer);
                        continue;
                    }

                    let conn_tag = connection_tag();
                    let log = Arc::clone(&self.log);
                    let flag = Arc::clone(&shutdown);
                    let thresholds = self.config.thresholds;
                    let recv_buffer_size = self.config.recv_buffer_size;

                    active.fetch_add(1, Ordering::SeqCst);
                    let counter = Arc::clone(&active);
                    let spawned = thread::Builder::new()
                        .name(format!("conn-{conn_tag}"))
                        .spawn(move || {
                            handler::handle_connection(
                                stream,
                                peer,
                                conn_tag,
                                log,
                                thresholds,
                                recv_buffer_size,
                                flag,
                            );
                            counter.fetch_sub(1, Ordering::SeqCst);
                        });
                    match spawned {
                        Ok(handle) => handlers.push(handle),
                        Err(e) => {
                            active.fetch_sub(1, Ordering::SeqCst);
                            log::error!("cannot spawn a handler for {peer}: {e}");
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    log::warn!("accept failed: {e}");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        log::info!(
            "shutdown requested; draining {} open sessions",
            handlers.len()
        );
        for handle in handlers {
            let _ = handle.join();
        }
        let _ = persist_thread.join();
        log::info!("server stopped");
        Ok(())
    }
}

fn refuse(mut stream: TcpStream, peer: SocketAddr) {
    if let Err(e) = stream.write_all(protocol::REPLY_BUSY.as_bytes()) {
        log::warn!("cannot send busy reply to {peer}: {e}");
    }
}

/// Short per-connection tag for log correlation.
fn connection_tag() -> String {
    let mut tag = Uuid::new_v4().simple().to_string();
    tag.truncate(8);
    tag
}
