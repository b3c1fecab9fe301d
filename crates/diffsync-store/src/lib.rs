//! # diffsync Store
//!
//! The synchronization store: documents, shadow documents, backup shadow
//! documents, and the pending-edit queue of every client session.
//!
//! ## Features
//!
//! - **DataStore trait**: the store contract, generic over content `T` and
//!   diff payload `D`
//! - **InMemoryDataStore**: sharded in-memory implementation with lock-free
//!   append/purge of pending edits
//!
//! ## Example
//!
//! ```rust,ignore
//! use diffsync_core::Edit;
//! use diffsync_store::{DataStore, InMemoryDataStore};
//!
//! let store = InMemoryDataStore::<String, String>::new();
//!
//! store.save_edits(Edit::new("12345", "client1", "diff".into()), "12345", "client1");
//! assert_eq!(store.edits("12345", "client1").len(), 1);
//!
//! // Acknowledge everything up to the edit's server version
//! let ack = store.edits("12345", "client1").remove(0);
//! store.remove_edit(&ack, "12345", "client1");
//! assert!(store.edits("12345", "client1").is_empty());
//! ```

pub mod memory;

// Re-exports
pub use memory::InMemoryDataStore;

use diffsync_core::{BackupShadowDocument, Document, Edit, ShadowDocument};

/// The synchronization store contract
///
/// None of these operations fail: a missing entry is a normal, expected
/// result. Concurrent mutation of the same key is absorbed internally and
/// never surfaced to callers.
///
/// The trait is generic over the content type `T` and the diff payload `D`,
/// so the same store serves any [`Synchronizer`](diffsync_core::Synchronizer).
pub trait DataStore<T, D>: Send + Sync {
    /// Insert a document only if none exists for its id
    ///
    /// Returns `false` and leaves the stored document untouched if one
    /// already exists. Use [`update_document`](Self::update_document) to
    /// replace.
    fn save_document(&self, document: Document<T>) -> bool;

    /// Replace the document for its id unconditionally (last writer wins)
    fn update_document(&self, document: Document<T>);

    /// Get the document for an id
    fn document(&self, document_id: &str) -> Option<Document<T>>;

    /// Replace the shadow for the session implied by `shadow.document`
    fn save_shadow_document(&self, shadow: ShadowDocument<T>);

    /// Get the shadow for a session
    fn shadow_document(&self, document_id: &str, client_id: &str) -> Option<ShadowDocument<T>>;

    /// Replace the backup for the session implied by the nested shadow
    fn save_backup_shadow_document(&self, backup: BackupShadowDocument<T>);

    /// Get the backup shadow for a session
    fn backup_shadow_document(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> Option<BackupShadowDocument<T>>;

    /// Append an edit to the end of the session's pending queue
    ///
    /// Creates the queue if absent. Safe under any number of concurrent
    /// callers on the same session: every appended edit ends up in the queue
    /// exactly once, in the order the appends completed.
    fn save_edits(&self, edit: Edit<D>, document_id: &str, client_id: &str);

    /// Remove every pending edit with `server_version <= edit.server_version`
    ///
    /// This purges everything the named edit acknowledges, not only the
    /// edit itself. Edits appended concurrently are never lost.
    fn remove_edit(&self, edit: &Edit<D>, document_id: &str, client_id: &str);

    /// Snapshot of the session's pending edits, oldest first
    ///
    /// Empty if the session has no queue.
    fn edits(&self, document_id: &str, client_id: &str) -> Vec<Edit<D>>;

    /// Delete the session's pending queue
    fn remove_edits(&self, document_id: &str, client_id: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that the DataStore trait is object-safe
    fn _assert_object_safe(_: &dyn DataStore<String, String>) {}

    fn edit(client_version: u64, server_version: u64) -> Edit<String> {
        Edit::new("12345", "client1", String::new())
            .with_client_version(client_version)
            .with_server_version(server_version)
            .with_checksum("bogus")
    }

    #[test]
    fn test_get_edits_round_trip() {
        let store: Box<dyn DataStore<String, String>> = Box::new(InMemoryDataStore::new());

        let edit_one = edit(0, 0);
        let edit_two = edit(1, 0);
        store.save_edits(edit_one.clone(), "12345", "client1");
        store.save_edits(edit_two, "12345", "client1");

        let edits = store.edits("12345", "client1");
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].client_version, 0);
        assert_eq!(edits[1].client_version, 1);

        // Both edits share server version 0, so acknowledging the first
        // purges every entry at or below it.
        store.remove_edit(&edit_one, "12345", "client1");
        assert!(
            store
                .edits("12345", "client1")
                .iter()
                .all(|e| e.server_version > edit_one.server_version)
        );
    }

    #[test]
    fn test_save_document_through_trait_object() {
        let store: Box<dyn DataStore<String, String>> = Box::new(InMemoryDataStore::new());

        assert!(store.save_document(Document::new("1234", "fletch".to_string())));
        let document = store.document("1234").unwrap();
        assert_eq!(document.content, "fletch");
    }
}
