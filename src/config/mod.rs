//! Configuration management
//!
//! Settings come from built-in defaults, an optional TOML file and a handful
//! of environment variables, in that order.

pub mod settings;

pub use settings::{
    BroadcastSettings, Config, ExecutorSettings, MiningSettings, NodeSettings, PeerSettings,
    StoreKind, StoreSettings,
};
