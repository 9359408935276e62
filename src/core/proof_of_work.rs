use crate::core::{Batch, Block, CancellationSignal, Transaction};
use crate::error::{ChainError, Result};
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::info;
use num_bigint::BigUint;
use std::fmt;

/// Threshold a block hash must stay strictly below.
///
/// Fixed for the lifetime of the process; there is no retargeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningTarget(BigUint);

impl MiningTarget {
    /// `2^(256 - difficulty)`, so each difficulty step halves the target
    pub fn from_difficulty(difficulty: u32) -> Result<MiningTarget> {
        if difficulty > 256 {
            return Err(ChainError::Config(format!(
                "Difficulty {difficulty} out of range (0..=256)"
            )));
        }
        Ok(MiningTarget(BigUint::from(1u8) << (256 - difficulty) as usize))
    }

    pub fn from_biguint(target: BigUint) -> MiningTarget {
        MiningTarget(target)
    }

    /// Accepts every possible SHA-256 output
    pub fn unbounded() -> MiningTarget {
        MiningTarget(BigUint::from(1u8) << 256usize)
    }

    /// Accepts nothing
    pub fn zero() -> MiningTarget {
        MiningTarget(BigUint::from(0u8))
    }

    /// Big-endian comparison of a raw digest against the target
    pub fn is_met_by(&self, hash: &[u8]) -> bool {
        BigUint::from_bytes_be(hash) < self.0
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Display for MiningTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// How a single search ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found { nonce: u64, hash: String },
    Cancelled { attempts: u64 },
}

pub struct ProofOfWork<'a> {
    pre_block_hash: &'a str,
    transactions: &'a [Transaction],
    target: &'a MiningTarget,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(
        pre_block_hash: &'a str,
        transactions: &'a [Transaction],
        target: &'a MiningTarget,
    ) -> ProofOfWork<'a> {
        ProofOfWork {
            pre_block_hash,
            transactions,
            target,
        }
    }

    /// Canonical byte layout hashed for a block.
    ///
    /// Every variable-length field carries a u64 big-endian length prefix so
    /// distinct field splits never serialize to the same bytes.
    pub fn prepare_data(pre_block_hash: &str, transactions: &[Transaction], nonce: u64) -> Vec<u8> {
        let mut data_bytes = vec![];
        push_field(&mut data_bytes, pre_block_hash.as_bytes());
        data_bytes.extend((transactions.len() as u64).to_be_bytes());
        for tx in transactions {
            push_field(&mut data_bytes, tx.get_id().as_bytes());
            push_field(&mut data_bytes, tx.get_data().as_bytes());
        }
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes
    }

    pub fn hash_hex(pre_block_hash: &str, transactions: &[Transaction], nonce: u64) -> String {
        let data = Self::prepare_data(pre_block_hash, transactions, nonce);
        HEXLOWER.encode(&sha256_digest(&data))
    }

    /// Check a block's digest and that it clears `target`
    pub fn validate(block: &Block, target: &MiningTarget) -> bool {
        let data = Self::prepare_data(
            block.get_pre_block_hash(),
            block.get_transactions(),
            block.get_nonce(),
        );
        let hash = sha256_digest(&data);
        HEXLOWER.encode(&hash) == block.get_hash() && target.is_met_by(&hash)
    }

    pub fn run(&self, cancel: &CancellationSignal) -> Result<SearchOutcome> {
        self.run_observed(cancel, |_| {})
    }

    /// Search nonces `0, 1, 2, ...`, calling `observe` with each nonce right
    /// before it is hashed. The cancellation signal is read once per nonce.
    pub fn run_observed<F>(&self, cancel: &CancellationSignal, mut observe: F) -> Result<SearchOutcome>
    where
        F: FnMut(u64),
    {
        let mut nonce: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                info!("Search cancelled after {nonce} attempts");
                return Ok(SearchOutcome::Cancelled { attempts: nonce });
            }
            observe(nonce);
            let data = Self::prepare_data(self.pre_block_hash, self.transactions, nonce);
            let hash = sha256_digest(&data);
            if self.target.is_met_by(&hash) {
                return Ok(SearchOutcome::Found {
                    nonce,
                    hash: HEXLOWER.encode(&hash),
                });
            }
            nonce = nonce.checked_add(1).ok_or_else(|| {
                ChainError::Mining("Nonce space exhausted without meeting target".to_string())
            })?;
        }
    }

    /// Run the search and seal a block on success
    pub fn mine(
        pre_block_hash: &str,
        transactions: Batch,
        target: &MiningTarget,
        cancel: &CancellationSignal,
    ) -> Result<Option<Block>> {
        let outcome = ProofOfWork::new(pre_block_hash, &transactions, target).run(cancel)?;
        Ok(match outcome {
            SearchOutcome::Found { nonce, hash } => Some(Block::sealed(
                pre_block_hash.to_string(),
                transactions,
                nonce,
                hash,
            )),
            SearchOutcome::Cancelled { .. } => None,
        })
    }
}

fn push_field(buf: &mut Vec<u8>, field: &[u8]) {
    buf.extend((field.len() as u64).to_be_bytes());
    buf.extend(field);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Batch {
        ["a", "b", "c"].map(|d| Transaction::new(d.to_string()))
    }

    #[test]
    fn test_target_from_difficulty() {
        let easy = MiningTarget::from_difficulty(1).unwrap();
        let hard = MiningTarget::from_difficulty(2).unwrap();
        assert!(hard.as_biguint() < easy.as_biguint());
        assert_eq!(
            MiningTarget::from_difficulty(0).unwrap(),
            MiningTarget::unbounded()
        );
        assert!(MiningTarget::from_difficulty(257).is_err());
    }

    #[test]
    fn test_target_comparison_is_strict() {
        let target = MiningTarget::from_biguint(BigUint::from(0x0100u32));
        assert!(target.is_met_by(&[0x00, 0xff]));
        assert!(!target.is_met_by(&[0x01, 0x00]));
        assert!(!MiningTarget::zero().is_met_by(&[0u8; 32]));
        assert!(MiningTarget::unbounded().is_met_by(&[0xffu8; 32]));
    }

    #[test]
    fn test_prepare_data_consistency() {
        let txs = batch();
        let data1 = ProofOfWork::prepare_data("genesis", &txs, 12345);
        let data2 = ProofOfWork::prepare_data("genesis", &txs, 12345);
        assert_eq!(data1, data2);
        assert_ne!(data1, ProofOfWork::prepare_data("genesis", &txs, 54321));
    }

    #[test]
    fn test_prepare_data_is_unambiguous() {
        let left = [Transaction::new("ab".to_string())];
        let right = [Transaction::new("a".to_string())];
        assert_ne!(
            ProofOfWork::prepare_data("x", &left, 0),
            ProofOfWork::prepare_data("xb", &right, 0)
        );
    }

    #[test]
    fn test_nonces_are_monotonic_until_cancel() {
        let txs = batch();
        let target = MiningTarget::zero();
        let cancel = CancellationSignal::new();
        let pow = ProofOfWork::new("genesis", &txs, &target);

        let mut seen = Vec::new();
        let outcome = pow
            .run_observed(&cancel, |nonce| {
                seen.push(nonce);
                if nonce == 49 {
                    cancel.trigger();
                }
            })
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Cancelled { attempts: 50 });
        assert_eq!(seen, (0..50).collect::<Vec<u64>>());
    }

    #[test]
    fn test_found_block_validates() {
        let target = MiningTarget::from_difficulty(4).unwrap();
        let block = ProofOfWork::mine("genesis", batch(), &target, &CancellationSignal::new())
            .unwrap()
            .expect("an easy target must be met");
        assert!(ProofOfWork::validate(&block, &target));
        assert!(block.verify_hash());
    }

    #[test]
    fn test_pre_cancelled_search_attempts_nothing() {
        let cancel = CancellationSignal::new();
        cancel.trigger();
        let block = ProofOfWork::mine("genesis", batch(), &MiningTarget::unbounded(), &cancel).unwrap();
        assert!(block.is_none());
    }
}
