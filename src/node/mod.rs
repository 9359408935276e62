//! Node runtime
//!
//! Wires the shared context, the collaborators and the long-lived tasks
//! together: one thread each for the intake listener, the announcement
//! listener, the miner and the block announcer.

pub mod context;

pub use context::NodeContext;

use crate::config::{Config, StoreKind};
use crate::core::{Block, Miner, MiningMode};
use crate::error::Result;
use crate::network::{
    BlockAnnouncer, BlockMonitor, BoundedSpawner, ConnectionSpawner, Ingestor, LineHandler,
    Listener, PeerDiscovery, StaticPeers, TailscaleDiscovery, ThreadPerConnection,
};
use crate::services::{FileStore, IpfsStore, LocalStore, PythonRunner};
use crate::storage::TransactionBuffer;
use log::{error, info};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct Node {
    config: Config,
    context: NodeContext,
}

impl Node {
    pub fn new(config: Config) -> Result<Node> {
        let target = config.mining_target()?;
        let buffer = TransactionBuffer::new(config.node.buffer_capacity);
        Ok(Node {
            context: NodeContext::new(buffer, target),
            config,
        })
    }

    pub fn context(&self) -> &NodeContext {
        &self.context
    }

    /// Start every task and block until all of them have stopped.
    ///
    /// A listener that fails to bind only takes its own task down.
    pub fn run(self, mode: MiningMode) -> Result<()> {
        let (block_tx, block_rx) = mpsc::channel::<Block>();
        let spawner = self.spawner();

        let ingestor = Arc::new(Ingestor::new(
            &self.context,
            build_store(&self.config)?,
            Arc::new(PythonRunner::new(self.config.executor.interpreter.clone())),
            self.config.node.staging_dir.clone(),
        )?);
        let monitor = Arc::new(BlockMonitor::new(&self.context));
        let miner = Miner::new(&self.context, self.config.mining.pre_block_hash.clone(), block_tx);
        let announce_to = if self.config.peers.announce_blocks {
            Some(build_discovery(&self.config)?)
        } else {
            None
        };
        let announcer = BlockAnnouncer::new(announce_to, self.config.peers.announce_port);

        info!("Mining target: {}", self.context.target());
        let handles = vec![
            spawn_listener(
                "transaction listener",
                self.config.node.intake_addr.clone(),
                ingestor,
                Arc::clone(&spawner),
            )?,
            spawn_listener(
                "block listener",
                self.config.node.announce_addr.clone(),
                monitor,
                spawner,
            )?,
            spawn_task("miner", move || match miner.run(mode) {
                Ok(blocks) => info!("Stopping mining thread after {} block(s)", blocks.len()),
                Err(e) => error!("Mining failed: {e}"),
            })?,
            spawn_task("announcer", move || announcer.run(block_rx))?,
        ];

        for handle in handles {
            let name = handle.thread().name().unwrap_or("task").to_string();
            if handle.join().is_err() {
                error!("Task {name} panicked");
            }
        }
        Ok(())
    }

    fn spawner(&self) -> Arc<dyn ConnectionSpawner> {
        match self.config.node.max_connections {
            Some(max) => Arc::new(BoundedSpawner::new(max)),
            None => Arc::new(ThreadPerConnection),
        }
    }
}

fn spawn_task<F>(name: &str, task: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    Ok(thread::Builder::new().name(name.to_string()).spawn(task)?)
}

fn spawn_listener<H: LineHandler>(
    name: &'static str,
    addr: String,
    handler: Arc<H>,
    spawner: Arc<dyn ConnectionSpawner>,
) -> Result<JoinHandle<()>> {
    spawn_task(name, move || match Listener::bind(name, &addr) {
        Ok(listener) => listener.serve(handler, spawner.as_ref()),
        Err(e) => error!("Error starting {name}: {e}"),
    })
}

/// The artifact store selected in `config`
pub fn build_store(config: &Config) -> Result<Arc<dyn FileStore>> {
    let store: Arc<dyn FileStore> = match config.store.kind {
        StoreKind::Ipfs => Arc::new(IpfsStore::new(
            config.store.ipfs_binary.clone(),
            config.store.ipfs_api.clone(),
        )),
        StoreKind::Local => Arc::new(LocalStore::new(config.store.local_dir.clone())?),
    };
    Ok(store)
}

/// Tailscale when enabled, otherwise the configured static peers
pub fn build_discovery(config: &Config) -> Result<Arc<dyn PeerDiscovery>> {
    if config.peers.use_tailscale {
        return Ok(Arc::new(TailscaleDiscovery::new(
            config.peers.tailscale_binary.clone(),
        )));
    }
    Ok(Arc::new(StaticPeers::parse(&config.peers.static_peers)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_uses_configured_capacity_and_target() {
        let mut config = Config::default();
        config.node.buffer_capacity = 5;
        config.mining.difficulty = 3;

        let node = Node::new(config).unwrap();
        assert_eq!(node.context().buffer().capacity(), 5);
        assert_eq!(
            *node.context().target(),
            crate::core::MiningTarget::from_difficulty(3).unwrap()
        );
    }

    #[test]
    fn test_static_discovery_when_tailscale_disabled() {
        let mut config = Config::default();
        config.peers.use_tailscale = false;
        config.peers.static_peers = vec!["10.0.0.5".to_string()];

        let discovery = build_discovery(&config).unwrap();
        assert_eq!(
            discovery.discover_peers().unwrap(),
            vec!["10.0.0.5".parse::<std::net::IpAddr>().unwrap()]
        );
    }
}
