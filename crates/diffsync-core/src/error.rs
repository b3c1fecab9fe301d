//! Error types for diffsync capabilities

use thiserror::Error;

/// Errors raised by a [`Synchronizer`](crate::Synchronizer) applying a diff
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Malformed diff: {0}")]
    MalformedDiff(String),

    #[error("Diff does not apply to content: {0}")]
    Conflict(String),
}

/// Errors raised by a [`Subscriber`](crate::Subscriber) delivering a message
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Channel closed for client {0}")]
    ChannelClosed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl PatchError {
    /// Create a new MalformedDiff error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDiff(message.into())
    }

    /// Create a new Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
