use crate::error::{ChainError, Result};
use log::{info, warn};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::process::Command;

/// Resolves the addresses of reachable peers.
pub trait PeerDiscovery: Send + Sync {
    fn discover_peers(&self) -> Result<Vec<IpAddr>>;
}

/// Fixed list of peers from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticPeers {
    peers: Vec<IpAddr>,
}

impl StaticPeers {
    pub fn new(peers: Vec<IpAddr>) -> Self {
        Self { peers }
    }

    /// Parse textual addresses, failing on the first invalid one
    pub fn parse(peers: &[String]) -> Result<Self> {
        let peers = peers
            .iter()
            .map(|p| {
                p.parse::<IpAddr>()
                    .map_err(|e| ChainError::Config(format!("Invalid peer address {p}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { peers })
    }
}

impl PeerDiscovery for StaticPeers {
    fn discover_peers(&self) -> Result<Vec<IpAddr>> {
        Ok(dedup(self.peers.iter().copied()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct TailscaleStatus {
    #[serde(rename = "Peer", default)]
    peer: HashMap<String, TailscaleNode>,
    #[serde(rename = "Self")]
    self_node: Option<TailscaleNode>,
}

#[derive(Debug, Default, Deserialize)]
struct TailscaleNode {
    #[serde(rename = "TailscaleIPs", default)]
    tailscale_ips: Vec<String>,
    #[serde(rename = "HostName", default)]
    host_name: String,
}

impl TailscaleNode {
    fn first_ip(&self) -> Option<IpAddr> {
        let raw = self.tailscale_ips.first()?;
        match raw.parse() {
            Ok(ip) => Some(ip),
            Err(e) => {
                warn!("Skipping {}: bad tailscale address {raw}: {e}", self.host_name);
                None
            }
        }
    }
}

/// Peers on the local tailnet, read from `tailscale status --json`.
///
/// Returns the first address of every peer plus this node's own address.
pub struct TailscaleDiscovery {
    binary: String,
}

impl Default for TailscaleDiscovery {
    fn default() -> Self {
        Self::new("tailscale")
    }
}

impl TailscaleDiscovery {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn parse_status(json: &str) -> Result<Vec<IpAddr>> {
        let status: TailscaleStatus = serde_json::from_str(json)
            .map_err(|e| ChainError::Discovery(format!("Error parsing JSON: {e}")))?;

        let peers = status.peer.values().filter_map(TailscaleNode::first_ip);
        let own = status.self_node.as_ref().and_then(TailscaleNode::first_ip);
        Ok(dedup(peers.chain(own)))
    }
}

impl PeerDiscovery for TailscaleDiscovery {
    fn discover_peers(&self) -> Result<Vec<IpAddr>> {
        let output = Command::new(&self.binary)
            .args(["status", "--json"])
            .output()
            .map_err(|e| ChainError::Discovery(format!("Error executing {}: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(ChainError::Discovery(format!(
                "{} status exited with {}",
                self.binary, output.status
            )));
        }

        let peers = Self::parse_status(&String::from_utf8_lossy(&output.stdout))?;
        info!("Tailscale discovery found {} peers", peers.len());
        Ok(peers)
    }
}

fn dedup(peers: impl Iterator<Item = IpAddr>) -> Vec<IpAddr> {
    peers.collect::<BTreeSet<_>>().into_iter().collect()
}
