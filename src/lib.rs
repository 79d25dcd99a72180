//! Real-time log fan-out relay
//!
//! Producers push structured log records over a WebSocket, the relay filters
//! them by severity and re-broadcasts every accepted record to all connected
//! consumers.

pub mod core;
pub mod fanout;
pub mod infrastructure;
pub mod ws;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use crate::core::{Envelope, Level, LevelFilter, LogRecord, ParseError};
pub use fanout::{ConnectionRegistry, Dispatcher, Handle, Relay, SubmitError, SubmitOutcome};
pub use infrastructure::config::{Config, ConfigError};

use thiserror::Error;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;
