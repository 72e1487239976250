//! Error types for ETABS automation.

use std::path::PathBuf;
use thiserror::Error;

/// Error codes for automation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Automation class is not registered (-1)
    NotInstalled = -1,
    /// No live application handle (-2)
    NotConnected = -2,
    /// Platform has no COM automation (-3)
    Unsupported = -3,
    /// Interop layer raised an error (E100)
    Interop = 100,
    /// API call returned a non-zero status (E101)
    Status = 101,
    /// Local file system failure (E200)
    Io = 200,
}

/// Main error type for calls into the automation layer.
#[derive(Debug, Error)]
pub enum EtabsError {
    #[error("ETABS automation interface is not registered")]
    NotInstalled,

    #[error("Not connected to ETABS")]
    NotConnected,

    #[error("ETABS automation is not available on this platform")]
    Unsupported,

    #[error("{call} failed: {message}")]
    Com { call: &'static str, message: String },

    #[error("{call} returned error code {code}")]
    Status { call: &'static str, code: i32 },

    #[error("Path is not valid UTF-16 text: {path}")]
    InvalidPath { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtabsError {
    /// Get the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EtabsError::NotInstalled => ErrorCode::NotInstalled,
            EtabsError::NotConnected => ErrorCode::NotConnected,
            EtabsError::Unsupported => ErrorCode::Unsupported,
            EtabsError::Com { .. } => ErrorCode::Interop,
            EtabsError::Status { .. } => ErrorCode::Status,
            EtabsError::InvalidPath { .. } => ErrorCode::Io,
            EtabsError::Io(_) => ErrorCode::Io,
        }
    }

    /// Get the numeric error code value.
    pub fn code_value(&self) -> i32 {
        self.code() as i32
    }

    /// Build a COM error for `call`.
    pub fn com(call: &'static str, message: impl Into<String>) -> Self {
        EtabsError::Com {
            call,
            message: message.into(),
        }
    }
}

/// Result type alias for automation operations.
pub type Result<T> = std::result::Result<T, EtabsError>;
