//! Error types for the data monitor

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for the data monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Buffer size outside of the accepted bounds
    #[error("Invalid buffer size {value}: must be between {min} and {max}")]
    InvalidBufferSize {
        /// Rejected value
        value: usize,
        /// Lower bound (inclusive)
        min: usize,
        /// Upper bound (inclusive)
        max: usize,
    },

    /// Wire payload could not be decoded into an event
    #[error("Parse error: {0}")]
    Parse(String),

    /// A listener failed while handling an event
    #[error("Listener error: {0}")]
    Listener(String),

    /// A rolling counter bucket overflowed
    #[error("Rolling counter overflow")]
    RateOverflow,

    /// The ingestion loop was started twice
    #[error("Event processor is already running")]
    AlreadyRunning,

    /// MQTT client error
    #[error("MQTT error: {0}")]
    Mqtt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Parse(err.to_string())
    }
}
