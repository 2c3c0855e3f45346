//! Error types for meter reading.
//!
//! Errors fall into two groups:
//!
//! - **Recoverable per batch**: [`MeterError::Transport`], [`MeterError::Timeout`],
//!   [`MeterError::Exception`] and [`MeterError::InvalidData`]. The batched read
//!   engine turns these into unavailable values for the affected measurements.
//! - **Fatal**: [`MeterError::TableDefect`] and [`MeterError::UnknownMeasurement`]
//!   surface during meter construction and are never swallowed.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type MeterResult<T> = Result<T, MeterError>;

/// Errors produced by register tables, the read engine and transports.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeterError {
    /// Serial/transport level failure (CRC mismatch, I/O error, no response).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// No response within the configured timeout.
    #[error("Timeout after {timeout_ms}ms: {message}")]
    Timeout { message: String, timeout_ms: u64 },

    /// The device answered with a Modbus exception.
    #[error("Modbus exception from unit {unit}: {code}")]
    Exception { unit: u8, code: String },

    /// The transport could not be opened.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Malformed or short response.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// The register table of a model is inconsistent.
    #[error("Register table defect in {model}: {message}")]
    TableDefect { model: String, message: String },

    /// A measurement name that is not part of the meter's table.
    #[error("Unknown measurement: {name}")]
    UnknownMeasurement { name: String },

    /// Invalid runtime configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Shutdown was requested while a read was pending.
    #[error("Interrupted")]
    Interrupted,
}

impl MeterError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            message: message.into(),
            timeout_ms,
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn table_defect(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TableDefect {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn unknown_measurement(name: impl Into<String>) -> Self {
        Self::UnknownMeasurement { name: name.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error only affects the batch that produced it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Timeout { .. }
                | Self::Exception { .. }
                | Self::InvalidData { .. }
        )
    }
}

impl From<std::io::Error> for MeterError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            Self::timeout(err.to_string(), 0)
        } else {
            Self::transport(err.to_string())
        }
    }
}
