//! # diffsync Core
//!
//! Core types, capability traits, and errors for differential
//! synchronization between one authoritative server copy of a document and
//! many client copies.
//!
//! This crate provides the data model that the store and the sync engine
//! share. It does not compute diffs and does not perform I/O: the diff
//! algorithm and the delivery transport are supplied through the
//! [`Synchronizer`] and [`Subscriber`] traits.
//!
//! ## Key Traits
//!
//! - [`Synchronizer`]: diff/patch/checksum capability for one content type
//! - [`Subscriber`]: delivery endpoint for [`PatchMessage`]s
//!
//! ## Key Types
//!
//! - [`Document`]: authoritative content, shared by every client
//! - [`ShadowDocument`]: per-client working copy plus version counters
//! - [`BackupShadowDocument`]: previous shadow retained for rollback
//! - [`Edit`]: one versioned diff plus a checksum
//! - [`PatchMessage`]: ordered batch of edits for one session
//! - [`SessionId`]: the `(document_id, client_id)` key
//!
//! ## Test Scaffolding
//!
//! - [`SpliceSynchronizer`]: single-splice text synchronizer
//! - [`MockSubscriber`]: channel-backed subscriber

pub mod document;
pub mod edit;
pub mod error;
pub mod mock_subscriber;
pub mod session;
pub mod splice;
pub mod traits;

pub use document::*;
pub use edit::*;
pub use error::*;
pub use mock_subscriber::*;
pub use session::*;
pub use splice::*;
pub use traits::*;

/// Compute a content checksum as a lowercase BLAKE3 hex digest.
///
/// Synchronizer implementations can use this for
/// [`Synchronizer::checksum`] over their canonical byte encoding.
pub fn checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
