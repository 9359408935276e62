use crate::error::{ChainError, Result};
use crate::network::{send_line, PeerDiscovery};
use crate::services::FileStore;
use log::{error, info, warn};
use rand::seq::SliceRandom;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What one broadcast round did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub script_ref: String,
    pub data_ref: String,
    pub delivered: usize,
    pub failed: usize,
}

/// Periodically publishes a random script/dataset pair to every peer's
/// intake port.
pub struct Broadcaster {
    store: Arc<dyn FileStore>,
    discovery: Arc<dyn PeerDiscovery>,
    algorithms_dir: PathBuf,
    datasets_dir: PathBuf,
    intake_port: u16,
    interval: Duration,
}

impl Broadcaster {
    pub fn new(
        store: Arc<dyn FileStore>,
        discovery: Arc<dyn PeerDiscovery>,
        algorithms_dir: impl Into<PathBuf>,
        datasets_dir: impl Into<PathBuf>,
        intake_port: u16,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            discovery,
            algorithms_dir: algorithms_dir.into(),
            datasets_dir: datasets_dir.into(),
            intake_port,
            interval,
        }
    }

    /// Wait one interval, broadcast, repeat. Failed rounds are logged and skipped.
    pub fn run(&self) {
        loop {
            thread::sleep(self.interval);
            match self.broadcast_once() {
                Ok(report) => info!(
                    "All data sent for this interval: {} delivered, {} failed",
                    report.delivered, report.failed
                ),
                Err(e) => error!("Broadcast round skipped: {e}"),
            }
        }
    }

    pub fn broadcast_once(&self) -> Result<BroadcastReport> {
        let peers = self.discovery.discover_peers()?;
        if peers.is_empty() {
            return Err(ChainError::Discovery("No peers to broadcast to".to_string()));
        }

        let script = pick_random_file(&self.algorithms_dir)?;
        let data = pick_random_file(&self.datasets_dir)?;

        let script_ref = self.store.put(&script)?;
        info!("Uploaded algorithm file {}. CID: {script_ref}", script.display());
        let data_ref = self.store.put(&data)?;
        info!("Uploaded data file {}. CID: {data_ref}", data.display());

        let line = format!("{script_ref} {data_ref}");
        let delivered = self.send_to_all(&peers, &line);

        Ok(BroadcastReport {
            script_ref,
            data_ref,
            delivered,
            failed: peers.len() - delivered,
        })
    }

    /// One thread per peer; returns how many sends succeeded
    fn send_to_all(&self, peers: &[IpAddr], line: &str) -> usize {
        thread::scope(|scope| {
            let sends: Vec<_> = peers
                .iter()
                .map(|ip| {
                    let addr = SocketAddr::new(*ip, self.intake_port).to_string();
                    scope.spawn(move || {
                        info!("Sending CIDs to server at {addr}");
                        match send_line(&addr, line) {
                            Ok(()) => true,
                            Err(e) => {
                                warn!("Error sending data to {addr}: {e}");
                                false
                            }
                        }
                    })
                })
                .collect();

            sends
                .into_iter()
                .map(|send| send.join())
                .filter(|sent| matches!(sent, Ok(true)))
                .count()
        })
    }
}

fn pick_random_file(dir: &Path) -> Result<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .map_err(|e| ChainError::Io(format!("Failed to list {}: {e}", dir.display())))?
    {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    files
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| ChainError::Io(format!("No files in {}", dir.display())))
}
