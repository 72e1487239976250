//! Uniform success/failure envelope printed by every command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one orchestrated operation.
///
/// A failed result always carries a non-empty `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure reason, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// UTC time the result was produced.
    pub timestamp: DateTime<Utc>,
    /// Operation payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> OperationResult<T> {
    /// Create a successful result.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            timestamp: Utc::now(),
            data: Some(data),
        }
    }

    /// Create a failed result without a payload.
    pub fn fail(error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "Unknown error".to_string();
        }

        Self {
            success: false,
            error: Some(error),
            timestamp: Utc::now(),
            data: None,
        }
    }

    /// Attach a payload to this result.
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    /// Process exit code for this result.
    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }
}

impl<T: Serialize> OperationResult<T> {
    /// Serialize to the pretty-printed JSON written on stdout.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
