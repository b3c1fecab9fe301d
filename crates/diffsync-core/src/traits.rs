//! Capability traits consumed by the store and the sync engine
//!
//! - [`Synchronizer`]: diff, patch, and checksum for one content type
//! - [`Subscriber`]: delivery of [`PatchMessage`]s to one client over some
//!   transport

use async_trait::async_trait;

use crate::edit::PatchMessage;
use crate::error::{DeliveryError, PatchError};

/// Diff/patch/checksum capability for content of type `T`
///
/// The store never calls this. The sync engine uses it with documents and
/// shadows read from the store, and persists the produced diffs inside
/// [`Edit`](crate::Edit)s without interpreting them.
pub trait Synchronizer<T>: Send + Sync {
    /// Opaque diff payload
    type Diff: Clone + Send + Sync + 'static;

    /// Compute the diff that turns `old` into `new`
    fn diff(&self, old: &T, new: &T) -> Self::Diff;

    /// Apply a diff to `content`, producing the new content
    ///
    /// # Errors
    ///
    /// Returns an error if the diff is malformed or cannot be applied.
    fn patch(&self, content: &T, diff: &Self::Diff) -> Result<T, PatchError>;

    /// Checksum of `content`, used to detect divergence
    fn checksum(&self, content: &T) -> String;
}

/// Delivery endpoint for one client
///
/// Identity is by [`client_id`](Subscriber::client_id), never by the
/// transport channel: two subscribers with the same client id are the same
/// subscriber.
#[async_trait]
pub trait Subscriber<D: Send + 'static>: Send + Sync {
    /// Transport handle the subscriber delivers over
    type Channel: ?Sized;

    /// Client this subscriber delivers to
    fn client_id(&self) -> &str;

    /// Underlying transport handle
    fn channel(&self) -> &Self::Channel;

    /// Deliver a patch message to the client
    async fn patched(&self, message: PatchMessage<D>) -> Result<(), DeliveryError>;
}
