//! Line-oriented TCP networking
//!
//! Two listeners feed the node: the intake port turns job descriptors into
//! transactions and the announcement port stops mining when a rival block
//! shows up. The outbound side pushes job references and mined blocks to
//! peers found through discovery.

pub mod announcer;
pub mod broadcaster;
pub mod client;
pub mod ingestor;
pub mod listener;
pub mod monitor;
pub mod peer_discovery;
pub mod spawner;

pub use announcer::BlockAnnouncer;
pub use broadcaster::{BroadcastReport, Broadcaster};
pub use client::send_line;
pub use ingestor::{Ingestor, JobDescriptor};
pub use listener::{LineHandler, Listener};
pub use monitor::{AcceptAll, BlockMonitor, BlockValidator};
pub use peer_discovery::{PeerDiscovery, StaticPeers, TailscaleDiscovery};
pub use spawner::{BoundedSpawner, ConnectionJob, ConnectionSpawner, ThreadPerConnection};
