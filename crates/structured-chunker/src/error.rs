use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur during document chunking.
///
/// Recoverable anomalies (unterminated fences, oversized atomic units, empty
/// documents) are never errors; they surface as chunk metadata flags.
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Input is not text: invalid UTF-8 or binary content
    #[error("Decode error at byte {offset}: {reason}")]
    Decode { offset: usize, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration bytes are neither JSON nor TOML
    #[error("Config parse error: {0}")]
    ConfigParse(String),

    /// A batch worker failed to complete
    #[error("Worker error: {0}")]
    Worker(String),
}

impl ChunkerError {
    /// Create a decode error
    pub fn decode(offset: usize, reason: impl Into<String>) -> Self {
        Self::Decode {
            offset,
            reason: reason.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a config parse error
    pub fn config_parse(msg: impl Into<String>) -> Self {
        Self::ConfigParse(msg.into())
    }

    /// Create a worker error
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }
}
