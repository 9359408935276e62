use crate::error::{ChainError, Result};
use log::{info, warn};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::thread;

/// Work to run for one accepted connection
pub type ConnectionJob = Box<dyn FnOnce() + Send + 'static>;

/// Decides how accepted connections get a thread of their own.
///
/// Returning an error rejects the connection; the listener keeps accepting.
pub trait ConnectionSpawner: Send + Sync {
    fn spawn(&self, peer: SocketAddr, job: ConnectionJob) -> Result<()>;
}

/// One OS thread per connection, no admission limit
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPerConnection;

impl ConnectionSpawner for ThreadPerConnection {
    fn spawn(&self, peer: SocketAddr, job: ConnectionJob) -> Result<()> {
        thread::Builder::new()
            .name(format!("conn-{peer}"))
            .spawn(job)
            .map(|_| ())
            .map_err(|e| ChainError::Network(format!("Failed to spawn handler for {peer}: {e}")))
    }
}

/// Thread per connection with a cap on concurrently open connections.
///
/// Connections over the limit are rejected, not queued.
#[derive(Clone)]
pub struct BoundedSpawner {
    /// Currently connected peers
    connected_peers: Arc<RwLock<HashSet<SocketAddr>>>,
    /// Maximum number of connections
    max_connections: usize,
}

impl BoundedSpawner {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connected_peers: Arc::new(RwLock::new(HashSet::new())),
            max_connections,
        }
    }

    /// Record a connection if there is room for it
    fn try_record_connection(&self, address: SocketAddr) -> Result<bool> {
        let mut connected = self
            .connected_peers
            .write()
            .map_err(|e| ChainError::Network(format!("Failed to acquire peer lock: {e}")))?;

        if connected.len() >= self.max_connections {
            return Ok(false);
        }
        connected.insert(address);
        info!("Connected to peer: {address}");
        Ok(true)
    }

    fn record_disconnection(&self, address: SocketAddr) -> Result<()> {
        let mut connected = self
            .connected_peers
            .write()
            .map_err(|e| ChainError::Network(format!("Failed to acquire peer lock: {e}")))?;

        connected.remove(&address);
        info!("Disconnected from peer: {address}");
        Ok(())
    }

    /// Get number of connected peers
    pub fn get_connected_count(&self) -> Result<usize> {
        let connected = self
            .connected_peers
            .read()
            .map_err(|e| ChainError::Network(format!("Failed to acquire peer lock: {e}")))?;
        Ok(connected.len())
    }
}

impl ConnectionSpawner for BoundedSpawner {
    fn spawn(&self, peer: SocketAddr, job: ConnectionJob) -> Result<()> {
        if !self.try_record_connection(peer)? {
            return Err(ChainError::Network(format!(
                "Connection limit of {} reached",
                self.max_connections
            )));
        }

        let tracker = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("conn-{peer}"))
            .spawn(move || {
                job();
                if let Err(e) = tracker.record_disconnection(peer) {
                    warn!("Failed to record disconnection: {e}");
                }
            });

        if let Err(e) = spawned {
            self.record_disconnection(peer)?;
            return Err(ChainError::Network(format!(
                "Failed to spawn handler for {peer}: {e}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_thread_per_connection_runs_job() {
        let (tx, rx) = mpsc::channel();
        ThreadPerConnection
            .spawn(
                "127.0.0.1:4000".parse().unwrap(),
                Box::new(move || tx.send(42).unwrap()),
            )
            .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn test_bounded_spawner_limits_connections() {
        let spawner = BoundedSpawner::new(1);
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();

        spawner
            .spawn(
                "127.0.0.1:4001".parse().unwrap(),
                Box::new(move || {
                    release_rx.recv().unwrap();
                    done_tx.send(()).unwrap();
                }),
            )
            .unwrap();
        assert_eq!(spawner.get_connected_count().unwrap(), 1);

        let rejected = spawner.spawn("127.0.0.1:4002".parse().unwrap(), Box::new(|| {}));
        assert!(rejected.is_err());

        release_tx.send(()).unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        // Disconnection is recorded right after the job returns.
        for _ in 0..100 {
            if spawner.get_connected_count().unwrap() == 0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(spawner.get_connected_count().unwrap(), 0);
    }
}
