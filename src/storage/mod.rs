//! In-memory staging of pending work
//!
//! The transaction buffer is the only state shared between the intake
//! connections and the miner. Nothing here is persisted.

pub mod transaction_buffer;

pub use transaction_buffer::{TransactionBuffer, DEFAULT_BUFFER_CAPACITY};
