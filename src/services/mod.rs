//! Adapters for the external collaborators
//!
//! The node only talks to the artifact store and the script executor through
//! these traits, so tests can swap in in-memory doubles.

pub mod file_store;
pub mod script;

pub use file_store::{FileStore, IpfsStore, LocalStore};
pub use script::{PythonRunner, ScriptRunner};
