//! Error handling for the block producer
//!
//! One error enum covers every fallible operation in the crate. Most of these
//! errors are recovered locally: the unit of work (one intake message, one
//! connection) is dropped and the caller keeps going.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Error types for the block producer and its collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Intake line with the wrong shape
    MalformedMessage { line: String, tokens: usize },
    /// Fetching or uploading an artifact failed
    FileStore(String),
    /// The script executor failed or exited non-zero
    Script(String),
    /// Network communication errors
    Network(String),
    /// Peer discovery errors
    Discovery(String),
    /// Configuration errors
    Config(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Mining errors
    Mining(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::MalformedMessage { line, tokens } => write!(
                f,
                "Malformed message: expected '<script_ref> <data_ref>', got {tokens} token(s) in {line:?}"
            ),
            ChainError::FileStore(msg) => write!(f, "File store error: {msg}"),
            ChainError::Script(msg) => write!(f, "Script execution error: {msg}"),
            ChainError::Network(msg) => write!(f, "Network error: {msg}"),
            ChainError::Discovery(msg) => write!(f, "Peer discovery error: {msg}"),
            ChainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            ChainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            ChainError::Io(msg) => write!(f, "I/O error: {msg}"),
            ChainError::Mining(msg) => write!(f, "Mining error: {msg}"),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_display() {
        let err = ChainError::MalformedMessage {
            line: "a b c".to_string(),
            tokens: 3,
        };
        let text = err.to_string();
        assert!(text.contains("3 token(s)"));
        assert!(text.contains("\"a b c\""));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ChainError = io.into();
        assert!(matches!(err, ChainError::Io(msg) if msg.contains("missing")));
    }
}
