//! In-memory synchronization store
//!
//! Every keyed collection is a sharded `DashMap`, so sessions on different
//! keys never contend on a shared lock.
//!
//! Pending edits are held as immutable `Arc<Vec<Edit>>` snapshots. Appends
//! and purges are read-copy-update loops: read the current snapshot, build
//! the next one without holding any lock, then swap it in only if the key
//! still holds the snapshot that was read (compared by `Arc` identity). A
//! failed swap means another caller won the race, and the loop retries from
//! a fresh read.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use diffsync_core::{BackupShadowDocument, Document, Edit, SessionId, ShadowDocument};
use tracing::{debug, trace};

use crate::DataStore;

/// Immutable pending-edit queue for one session
type EditQueue<D> = Arc<Vec<Edit<D>>>;

/// In-memory implementation of [`DataStore`]
///
/// Suitable for tests, examples, and single-process servers.
#[derive(Debug)]
pub struct InMemoryDataStore<T, D> {
    /// Authoritative documents by document id
    documents: DashMap<String, Document<T>>,
    /// Shadow documents by session
    shadows: DashMap<SessionId, ShadowDocument<T>>,
    /// Backup shadow documents by session
    backups: DashMap<SessionId, BackupShadowDocument<T>>,
    /// Pending-edit queues by session
    pending: DashMap<SessionId, EditQueue<D>>,
    /// Number of conditional swaps that lost a race and were retried
    contended_swaps: AtomicUsize,
}

impl<T, D> Default for InMemoryDataStore<T, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D> InMemoryDataStore<T, D> {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            shadows: DashMap::new(),
            backups: DashMap::new(),
            pending: DashMap::new(),
            contended_swaps: AtomicUsize::new(0),
        }
    }

    /// Number of stored documents
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of sessions with a shadow document
    pub fn session_count(&self) -> usize {
        self.shadows.len()
    }

    /// Number of sessions with a non-empty pending-edit queue
    pub fn pending_session_count(&self) -> usize {
        self.pending.len()
    }

    /// Total pending edits across all sessions
    pub fn total_pending(&self) -> usize {
        self.pending.iter().map(|queue| queue.len()).sum()
    }

    /// Number of queue swaps retried because of a concurrent writer
    pub fn contended_swaps(&self) -> usize {
        self.contended_swaps.load(Ordering::Relaxed)
    }

    /// Current queue snapshot for a session
    ///
    /// The shard read lock is released before returning.
    fn current_edits(&self, id: &SessionId) -> Option<EditQueue<D>> {
        self.pending.get(id).map(|queue| Arc::clone(queue.value()))
    }

    /// Install `next` for `id` only if the key still holds `expected`
    ///
    /// `expected == None` means the key must still be absent. Only the
    /// owning shard is locked, and only for the identity check and the
    /// store.
    fn compare_and_swap(
        &self,
        id: &SessionId,
        expected: Option<&EditQueue<D>>,
        next: EditQueue<D>,
    ) -> bool {
        let swapped = match (self.pending.entry(id.clone()), expected) {
            (Entry::Occupied(mut slot), Some(expected)) if Arc::ptr_eq(slot.get(), expected) => {
                slot.insert(next);
                true
            }
            (Entry::Vacant(slot), None) => {
                slot.insert(next);
                true
            }
            _ => false,
        };

        if !swapped {
            self.contended_swaps.fetch_add(1, Ordering::Relaxed);
            trace!(session = %id, "Pending queue changed during update, retrying");
        }
        swapped
    }
}

impl<T, D> DataStore<T, D> for InMemoryDataStore<T, D>
where
    T: Clone + Send + Sync,
    D: Clone + Send + Sync,
{
    fn save_document(&self, document: Document<T>) -> bool {
        match self.documents.entry(document.id.clone()) {
            Entry::Occupied(_) => {
                trace!(document_id = %document.id, "Document already exists, not saved");
                false
            }
            Entry::Vacant(slot) => {
                debug!(document_id = %document.id, "Saved new document");
                slot.insert(document);
                true
            }
        }
    }

    fn update_document(&self, document: Document<T>) {
        trace!(document_id = %document.id, "Updating document");
        self.documents.insert(document.id.clone(), document);
    }

    fn document(&self, document_id: &str) -> Option<Document<T>> {
        self.documents.get(document_id).map(|doc| doc.clone())
    }

    fn save_shadow_document(&self, shadow: ShadowDocument<T>) {
        let id = shadow.session_id();
        trace!(
            session = %id,
            client_version = shadow.client_version,
            server_version = shadow.server_version,
            "Saving shadow document"
        );
        self.shadows.insert(id, shadow);
    }

    fn shadow_document(&self, document_id: &str, client_id: &str) -> Option<ShadowDocument<T>> {
        let id = SessionId::new(document_id, client_id);
        self.shadows.get(&id).map(|shadow| shadow.clone())
    }

    fn save_backup_shadow_document(&self, backup: BackupShadowDocument<T>) {
        let id = backup.session_id();
        trace!(session = %id, version = backup.version, "Saving backup shadow document");
        self.backups.insert(id, backup);
    }

    fn backup_shadow_document(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> Option<BackupShadowDocument<T>> {
        let id = SessionId::new(document_id, client_id);
        self.backups.get(&id).map(|backup| backup.clone())
    }

    fn save_edits(&self, edit: Edit<D>, document_id: &str, client_id: &str) {
        let id = SessionId::new(document_id, client_id);
        loop {
            let current = self.current_edits(&id);
            let mut next = Vec::with_capacity(current.as_ref().map_or(1, |queue| queue.len() + 1));
            if let Some(queue) = &current {
                next.extend(queue.iter().cloned());
            }
            next.push(edit.clone());

            if self.compare_and_swap(&id, current.as_ref(), Arc::new(next)) {
                break;
            }
        }
        trace!(
            session = %id,
            client_version = edit.client_version,
            server_version = edit.server_version,
            "Queued pending edit"
        );
    }

    fn remove_edit(&self, edit: &Edit<D>, document_id: &str, client_id: &str) {
        let id = SessionId::new(document_id, client_id);
        loop {
            let Some(current) = self.current_edits(&id) else {
                return;
            };

            let remaining: Vec<_> = current
                .iter()
                .filter(|pending| pending.server_version > edit.server_version)
                .cloned()
                .collect();
            let removed = current.len() - remaining.len();
            if removed == 0 {
                return;
            }

            let swapped = if remaining.is_empty() {
                let dropped = self
                    .pending
                    .remove_if(&id, |_, queue| Arc::ptr_eq(queue, &current))
                    .is_some();
                if !dropped {
                    self.contended_swaps.fetch_add(1, Ordering::Relaxed);
                }
                dropped
            } else {
                self.compare_and_swap(&id, Some(&current), Arc::new(remaining))
            };

            if swapped {
                debug!(
                    session = %id,
                    up_to = edit.server_version,
                    removed,
                    "Removed acknowledged edits"
                );
                return;
            }
        }
    }

    fn edits(&self, document_id: &str, client_id: &str) -> Vec<Edit<D>> {
        let id = SessionId::new(document_id, client_id);
        self.current_edits(&id)
            .map(|queue| queue.as_ref().clone())
            .unwrap_or_default()
    }

    fn remove_edits(&self, document_id: &str, client_id: &str) {
        let id = SessionId::new(document_id, client_id);
        if let Some((_, queue)) = self.pending.remove(&id) {
            debug!(session = %id, removed = queue.len(), "Cleared pending edits");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffsync_core::ClientDocument;

    const DOC: &str = "12345";
    const CLIENT: &str = "client1";

    fn edit(server_version: u64) -> Edit<String> {
        Edit::new(DOC, CLIENT, format!("diff-{server_version}"))
            .with_server_version(server_version)
            .with_checksum("bogus")
    }

    fn shadow(content: &str, client_version: u64, server_version: u64) -> ShadowDocument<String> {
        ShadowDocument::new(
            ClientDocument::new(DOC, CLIENT, content.to_string()),
            client_version,
            server_version,
        )
    }

    // ========================================================================
    // Documents
    // ========================================================================

    #[test]
    fn test_save_document_is_create_only() {
        let store = InMemoryDataStore::<String, String>::new();

        assert!(store.save_document(Document::new("1234", "first".to_string())));
        assert!(!store.save_document(Document::new("1234", "second".to_string())));

        assert_eq!(store.document("1234").unwrap().content, "first");
        assert_eq!(store.document_count(), 1);
    }

    #[test]
    fn test_update_document_replaces() {
        let store = InMemoryDataStore::<String, String>::new();
        store.save_document(Document::new("1234", "first".to_string()));
        store.update_document(Document::new("1234", "second".to_string()));
        assert_eq!(store.document("1234").unwrap().content, "second");
    }

    #[test]
    fn test_update_document_creates_when_missing() {
        let store = InMemoryDataStore::<String, String>::new();
        store.update_document(Document::new("1234", "content".to_string()));
        assert!(!store.save_document(Document::new("1234", "other".to_string())));
        assert_eq!(store.document("1234").unwrap().content, "content");
    }

    #[test]
    fn test_missing_lookups_are_absent() {
        let store = InMemoryDataStore::<String, String>::new();
        assert!(store.document("nope").is_none());
        assert!(store.shadow_document(DOC, CLIENT).is_none());
        assert!(store.backup_shadow_document(DOC, CLIENT).is_none());
    }

    // ========================================================================
    // Shadows and backups
    // ========================================================================

    #[test]
    fn test_shadow_keyed_by_session() {
        let store = InMemoryDataStore::<String, String>::new();
        store.save_shadow_document(shadow("a", 0, 0));
        store.save_shadow_document(ShadowDocument::new(
            ClientDocument::new(DOC, "client2", "b".to_string()),
            0,
            0,
        ));

        assert_eq!(store.shadow_document(DOC, CLIENT).unwrap().document.content, "a");
        assert_eq!(store.shadow_document(DOC, "client2").unwrap().document.content, "b");
        assert_eq!(store.session_count(), 2);
    }

    #[test]
    fn test_shadow_replaced_wholesale() {
        let store = InMemoryDataStore::<String, String>::new();
        store.save_shadow_document(shadow("a", 0, 0));
        store.save_shadow_document(shadow("b", 1, 2));

        let stored = store.shadow_document(DOC, CLIENT).unwrap();
        assert_eq!(stored.document.content, "b");
        assert_eq!(stored.client_version, 1);
        assert_eq!(stored.server_version, 2);
    }

    #[test]
    fn test_backup_keyed_by_nested_shadow() {
        let store = InMemoryDataStore::<String, String>::new();
        store.save_backup_shadow_document(BackupShadowDocument::new(shadow("a", 0, 3), 3));
        store.save_backup_shadow_document(BackupShadowDocument::new(shadow("b", 1, 4), 4));

        let backup = store.backup_shadow_document(DOC, CLIENT).unwrap();
        assert_eq!(backup.version, 4);
        assert_eq!(backup.shadow.document.content, "b");
        assert!(store.backup_shadow_document(DOC, "client2").is_none());
    }

    // ========================================================================
    // Pending edits
    // ========================================================================

    #[test]
    fn test_edits_empty_without_queue() {
        let store = InMemoryDataStore::<String, String>::new();
        assert!(store.edits(DOC, CLIENT).is_empty());

        // No-op on a session without a queue
        store.remove_edits(DOC, CLIENT);
        store.remove_edit(&edit(1), DOC, CLIENT);
        assert!(store.edits(DOC, CLIENT).is_empty());
        assert_eq!(store.pending_session_count(), 0);
    }

    #[test]
    fn test_save_edits_appends_in_order() {
        let store = InMemoryDataStore::<String, String>::new();
        for version in 1..=5 {
            store.save_edits(edit(version), DOC, CLIENT);
        }

        let versions: Vec<_> = store
            .edits(DOC, CLIENT)
            .iter()
            .map(|e| e.server_version)
            .collect();
        assert_eq!(versions, vec![1, 2, 3, 4, 5]);
        assert_eq!(store.total_pending(), 5);
    }

    #[test]
    fn test_remove_edit_purges_up_to_version() {
        let store = InMemoryDataStore::<String, String>::new();
        for version in 1..=5 {
            store.save_edits(edit(version), DOC, CLIENT);
        }

        store.remove_edit(&edit(3), DOC, CLIENT);

        let remaining = store.edits(DOC, CLIENT);
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].server_version, 4);
        assert_eq!(remaining[1].server_version, 5);
        assert_eq!(remaining[0].diff, "diff-4");
    }

    #[test]
    fn test_remove_edit_purging_everything_drops_queue() {
        let store = InMemoryDataStore::<String, String>::new();
        for version in 1..=3 {
            store.save_edits(edit(version), DOC, CLIENT);
        }

        store.remove_edit(&edit(10), DOC, CLIENT);
        assert!(store.edits(DOC, CLIENT).is_empty());
        assert_eq!(store.pending_session_count(), 0);

        // Appending afterwards starts a fresh queue
        store.save_edits(edit(11), DOC, CLIENT);
        assert_eq!(store.edits(DOC, CLIENT).len(), 1);
    }

    #[test]
    fn test_remove_edit_below_all_versions_is_noop() {
        let store = InMemoryDataStore::<String, String>::new();
        for version in 5..=7 {
            store.save_edits(edit(version), DOC, CLIENT);
        }

        store.remove_edit(&edit(4), DOC, CLIENT);
        assert_eq!(store.edits(DOC, CLIENT).len(), 3);
    }

    #[test]
    fn test_remove_edits_clears_session_only() {
        let store = InMemoryDataStore::<String, String>::new();
        store.save_edits(edit(1), DOC, CLIENT);
        store.save_edits(Edit::new(DOC, "client2", String::new()), DOC, "client2");

        store.remove_edits(DOC, CLIENT);

        assert!(store.edits(DOC, CLIENT).is_empty());
        assert_eq!(store.edits(DOC, "client2").len(), 1);
    }

    #[test]
    fn test_edits_snapshot_is_detached() {
        let store = InMemoryDataStore::<String, String>::new();
        store.save_edits(edit(1), DOC, CLIENT);

        let mut snapshot = store.edits(DOC, CLIENT);
        snapshot.clear();
        snapshot.push(edit(99));

        let stored = store.edits(DOC, CLIENT);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].server_version, 1);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_appends() {
        let store = InMemoryDataStore::<String, String>::new();
        store.save_edits(edit(1), DOC, CLIENT);
        let snapshot = store.edits(DOC, CLIENT);

        store.save_edits(edit(2), DOC, CLIENT);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.edits(DOC, CLIENT).len(), 2);
    }

    #[test]
    fn test_compare_and_swap_rejects_stale_snapshot() {
        let store = InMemoryDataStore::<String, String>::new();
        let id = SessionId::new(DOC, CLIENT);
        store.save_edits(edit(1), DOC, CLIENT);

        let stale = store.current_edits(&id).unwrap();
        store.save_edits(edit(2), DOC, CLIENT);

        assert!(!store.compare_and_swap(&id, Some(&stale), Arc::new(vec![edit(3)])));
        assert!(!store.compare_and_swap(&id, None, Arc::new(vec![edit(3)])));
        assert_eq!(store.edits(DOC, CLIENT).len(), 2);
        assert_eq!(store.contended_swaps(), 2);

        let fresh = store.current_edits(&id).unwrap();
        assert!(store.compare_and_swap(&id, Some(&fresh), Arc::new(vec![edit(3)])));
        assert_eq!(store.edits(DOC, CLIENT)[0].server_version, 3);
    }
}
