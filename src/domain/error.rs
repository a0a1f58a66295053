//! Domain error types

use thiserror::Error;

/// Errors that can occur while talking to a serial device
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Port not found: {0}")]
    NotFound(String),

    #[error("Access denied to port {0} (already in use?)")]
    AccessDenied(String),

    #[error("Failed to read line settings: {0}")]
    ConfigRead(String),

    #[error("Failed to apply line settings: {0}")]
    ConfigWrite(String),

    #[error("Invalid port configuration: {0}")]
    InvalidConfig(String),

    #[error("Serial I/O error: {0}")]
    Io(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Port enumeration unavailable: {0}")]
    EnumerationUnavailable(String),

    #[error("Invalid or closed port handle")]
    InvalidHandle,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Bridge configuration error: {0}")]
    Settings(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Stable numeric code reported through `comlink_last_error`.
    /// `0` is reserved for "no error".
    pub fn code(&self) -> i32 {
        match self {
            BridgeError::NotFound(_) => 1,
            BridgeError::AccessDenied(_) => 2,
            BridgeError::ConfigRead(_) => 3,
            BridgeError::ConfigWrite(_) => 4,
            BridgeError::InvalidConfig(_) => 5,
            BridgeError::Io(_) => 6,
            BridgeError::Timeout(_) => 7,
            BridgeError::EnumerationUnavailable(_) => 8,
            BridgeError::InvalidHandle => 9,
            BridgeError::InvalidArgument(_) => 10,
            BridgeError::Settings(_) => 11,
            BridgeError::Internal(_) => 12,
        }
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
