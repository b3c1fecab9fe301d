//! Error types for diffsync-engine

use diffsync_core::{DeliveryError, PatchError, SessionId};
use thiserror::Error;

/// Errors that can occur while reconciling a session
///
/// Divergence is not an error: it is reported through
/// [`PatchOutcome::Diverged`](crate::PatchOutcome::Diverged).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("No backup shadow for session: {0}")]
    BackupNotFound(SessionId),

    #[error("Patch failed: {0}")]
    Patch(#[from] PatchError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
