use crate::core::{ProofOfWork, Transaction};
use serde::{Deserialize, Serialize};

/// Number of transactions sealed into every block
pub const BATCH_SIZE: usize = 3;

/// The ordered transactions a block commits to
pub type Batch = [Transaction; BATCH_SIZE];

/// A block that satisfied the mining target.
///
/// Blocks only exist after a successful search, so `hash` is always the
/// digest of `(pre_block_hash, transactions, nonce)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pre_block_hash: String,
    transactions: Batch,
    nonce: u64,
    hash: String,
}

impl Block {
    pub(crate) fn sealed(pre_block_hash: String, transactions: Batch, nonce: u64, hash: String) -> Block {
        Block {
            pre_block_hash,
            transactions,
            nonce,
            hash,
        }
    }

    pub fn get_pre_block_hash(&self) -> &str {
        self.pre_block_hash.as_str()
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    /// Recompute the digest from the block contents and compare it with `hash`
    pub fn verify_hash(&self) -> bool {
        let digest = ProofOfWork::hash_hex(&self.pre_block_hash, &self.transactions, self.nonce);
        digest == self.hash
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
