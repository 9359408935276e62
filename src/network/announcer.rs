use crate::core::Block;
use crate::network::{send_line, PeerDiscovery};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Drains mined blocks and, when peers are configured, pushes each one to
/// their announcement port as a single JSON line.
pub struct BlockAnnouncer {
    discovery: Option<Arc<dyn PeerDiscovery>>,
    announce_port: u16,
}

impl BlockAnnouncer {
    pub fn new(discovery: Option<Arc<dyn PeerDiscovery>>, announce_port: u16) -> Self {
        Self {
            discovery,
            announce_port,
        }
    }

    /// Runs until every sender of `blocks` is dropped
    pub fn run(&self, blocks: Receiver<Block>) {
        for block in blocks {
            info!(
                "Block {} ready (prev {}, nonce {})",
                block.get_hash(),
                block.get_pre_block_hash(),
                block.get_nonce()
            );
            let delivered = self.announce(&block);
            if delivered > 0 {
                info!("Announced block {} to {delivered} peers", block.get_hash());
            }
        }
    }

    /// Returns the number of peers that accepted the announcement
    pub fn announce(&self, block: &Block) -> usize {
        let Some(discovery) = &self.discovery else {
            return 0;
        };
        let peers = match discovery.discover_peers() {
            Ok(peers) => peers,
            Err(e) => {
                error!("Cannot announce block {}: {e}", block.get_hash());
                return 0;
            }
        };
        let line = match block.to_json() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize block {}: {e}", block.get_hash());
                return 0;
            }
        };

        peers
            .into_iter()
            .map(|ip| SocketAddr::new(ip, self.announce_port).to_string())
            .filter(|addr| match send_line(addr, &line) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to announce block to {addr}: {e}");
                    false
                }
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CancellationSignal, MiningTarget, ProofOfWork, Transaction};
    use crate::network::StaticPeers;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    fn block() -> Block {
        let batch = ["a", "b", "c"].map(|d| Transaction::new(d.to_string()));
        ProofOfWork::mine("genesis", batch, &MiningTarget::unbounded(), &CancellationSignal::new())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_disabled_announcer_sends_nothing() {
        assert_eq!(BlockAnnouncer::new(None, 8081).announce(&block()), 0);
    }

    #[test]
    fn test_announce_sends_json_line() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let peers = Arc::new(StaticPeers::new(vec!["127.0.0.1".parse().unwrap()]));
        let announcer = BlockAnnouncer::new(Some(peers), port);

        let block = block();
        assert_eq!(announcer.announce(&block), 1);

        let (stream, _) = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(stream).read_line(&mut line).unwrap();
        let decoded: Block = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(decoded, block);
    }
}
