use crate::core::{Batch, Block, CancellationSignal, MiningTarget, ProofOfWork, SearchOutcome};
use crate::error::Result;
use crate::node::NodeContext;
use crate::storage::TransactionBuffer;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Whether the miner stops after its first attempt or keeps producing blocks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MiningMode {
    /// Collect one batch, search once, stop
    #[default]
    SingleShot,
    /// Chain attempts on the last mined hash until one is cancelled
    Continuous,
}

/// Terminal state of one mining attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    Found(Block),
    Cancelled { attempts: u64 },
}

/// Single consumer of the transaction buffer.
pub struct Miner {
    buffer: Arc<TransactionBuffer>,
    target: Arc<MiningTarget>,
    cancel: CancellationSignal,
    blocks: Sender<Block>,
    pre_block_hash: String,
}

impl Miner {
    pub fn new(context: &NodeContext, pre_block_hash: String, blocks: Sender<Block>) -> Miner {
        Miner {
            buffer: context.buffer(),
            target: context.target(),
            cancel: context.cancellation(),
            blocks,
            pre_block_hash,
        }
    }

    /// Block on the buffer until a full batch is collected, in dequeue order
    pub fn collect_batch(&self) -> Batch {
        std::array::from_fn(|slot| {
            let tx = self.buffer.dequeue();
            info!("Added transaction {} to batch slot {slot}", tx.get_id());
            tx
        })
    }

    /// One attempt on top of the configured previous hash
    pub fn run_once(&self) -> Result<MiningOutcome> {
        self.attempt(&self.pre_block_hash)
    }

    fn attempt(&self, pre_block_hash: &str) -> Result<MiningOutcome> {
        let batch = self.collect_batch();
        info!("Batch complete, searching on top of {pre_block_hash} (target {})", self.target);

        let outcome = ProofOfWork::new(pre_block_hash, &batch, &self.target).run(&self.cancel)?;
        match outcome {
            SearchOutcome::Found { nonce, hash } => {
                let block = Block::sealed(pre_block_hash.to_string(), batch, nonce, hash);
                info!("Mined a new block: {} (nonce {nonce})", block.get_hash());
                if self.blocks.send(block.clone()).is_err() {
                    warn!("No receiver for mined block {}", block.get_hash());
                }
                Ok(MiningOutcome::Found(block))
            }
            SearchOutcome::Cancelled { attempts } => {
                info!("Stopping mining: competing block observed after {attempts} attempts");
                Ok(MiningOutcome::Cancelled { attempts })
            }
        }
    }

    /// Drive attempts according to `mode`, returning every mined block
    pub fn run(&self, mode: MiningMode) -> Result<Vec<Block>> {
        let mut mined = Vec::new();
        let mut pre_block_hash = self.pre_block_hash.clone();
        loop {
            match self.attempt(&pre_block_hash)? {
                MiningOutcome::Found(block) => {
                    pre_block_hash = block.get_hash().to_string();
                    mined.push(block);
                }
                MiningOutcome::Cancelled { .. } => break,
            }
            if mode == MiningMode::SingleShot || self.cancel.is_cancelled() {
                break;
            }
        }
        Ok(mined)
    }
}
