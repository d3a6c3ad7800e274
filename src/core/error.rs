//! Error types for the log pipeline

use super::fault::ChainFault;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Destination failed to initialize
    #[error("Setup of destination '{destination}' failed: {message}")]
    Setup { destination: String, message: String },

    /// Destination failed to accept a batch
    #[error("Write to destination '{destination}' failed: {message}")]
    Write { destination: String, message: String },

    /// Entry posted to a chain that no longer accepts input
    #[error("Chain for destination '{destination}' is closed")]
    ChainClosed { destination: String },

    /// Logger already disposed
    #[error("Logger already disposed")]
    Disposed,

    /// Shutdown observed the cancellation signal
    #[error("Log pipeline was cancelled")]
    Cancelled,

    /// One or more chains ended in a fault
    #[error("{} destination chain(s) faulted: {}", faults.len(), summarize(faults))]
    ChainsFaulted { faults: Vec<ChainFault> },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn summarize(faults: &[ChainFault]) -> String {
    faults
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a destination setup error
    pub fn setup(destination: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Setup {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create a destination write error
    pub fn write(destination: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Write {
            destination: destination.into(),
            message: message.into(),
        }
    }

    pub fn chain_closed(destination: impl Into<String>) -> Self {
        LoggerError::ChainClosed {
            destination: destination.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Faults carried by a `ChainsFaulted` error, empty for every other kind
    pub fn faults(&self) -> &[ChainFault] {
        match self {
            LoggerError::ChainsFaulted { faults } => faults,
            _ => &[],
        }
    }
}
