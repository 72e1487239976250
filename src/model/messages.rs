//! Append-only progress message trail.

use serde::{Deserialize, Serialize};

/// Ordered, human-readable progress messages for one operation.
///
/// Lines can only be appended. The trail is moved into the payload when the
/// operation finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTrail(Vec<String>);

impl MessageTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed check.
    pub fn pass(&mut self, message: impl AsRef<str>) {
        self.push_prefixed('✓', message.as_ref());
    }

    /// Failed check.
    pub fn fail(&mut self, message: impl AsRef<str>) {
        self.push_prefixed('✗', message.as_ref());
    }

    /// Informational step.
    pub fn info(&mut self, message: impl AsRef<str>) {
        self.push_prefixed('ℹ', message.as_ref());
    }

    /// Downgraded, non-fatal problem.
    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.push_prefixed('⚠', message.as_ref());
    }

    /// Unprefixed hint line.
    pub fn hint(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    fn push_prefixed(&mut self, prefix: char, message: &str) {
        tracing::debug!("{} {}", prefix, message);
        self.0.push(format!("{} {}", prefix, message));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}
