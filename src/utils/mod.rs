//! Utility functions and helpers
//!
//! Hashing helpers shared by transactions and the proof-of-work search.

pub mod crypto;

pub use crypto::{sha256_digest, sha256_hex};
