//! Core block production
//!
//! Transactions, blocks, the proof-of-work search and the miner that drives
//! it, plus the cancellation signal that preempts a running search.

pub mod block;
pub mod cancellation;
pub mod miner;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Batch, Block, BATCH_SIZE};
pub use cancellation::CancellationSignal;
pub use miner::{Miner, MiningMode, MiningOutcome};
pub use proof_of_work::{MiningTarget, ProofOfWork, SearchOutcome};
pub use transaction::Transaction;
