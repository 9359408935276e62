//! # Compute Chain - single-node proof-of-work block producer
//!
//! Peers publish a script and a dataset to a content store and send the two
//! references to this node. The node runs the script, turns the output into a
//! transaction, and once three are buffered it searches for a nonce whose
//! block hash falls below the mining target. A block announced by anyone else
//! stops the search.
//!
//! ## Layout
//! - `core/`: transactions, blocks, the proof-of-work search, the miner and
//!   the cancellation signal
//! - `storage/`: the bounded transaction buffer
//! - `network/`: intake and announcement listeners, peer discovery, the
//!   job broadcaster and the block announcer
//! - `services/`: adapters for the artifact store and the script executor
//! - `node/`: shared context and the runtime that starts every task
//! - `config/`: TOML and environment configuration
//! - `cli/`: command-line interface
//!
//! ## Data flow
//! intake line → `Ingestor` → `TransactionBuffer` → `Miner` → mined block
//! channel → `BlockAnnouncer`. Separately, announcement line →
//! `BlockMonitor` → `CancellationSignal` → `Miner`.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod node;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    Batch, Block, CancellationSignal, Miner, MiningMode, MiningOutcome, MiningTarget, ProofOfWork,
    Transaction, BATCH_SIZE,
};
pub use error::{ChainError, Result};
pub use network::{
    send_line, BlockAnnouncer, BlockMonitor, Broadcaster, Ingestor, Listener, PeerDiscovery,
};
pub use node::{Node, NodeContext};
pub use services::{FileStore, ScriptRunner};
pub use storage::TransactionBuffer;
pub use utils::{sha256_digest, sha256_hex};
