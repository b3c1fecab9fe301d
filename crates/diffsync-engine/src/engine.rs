//! Server-side shadow reconciliation
//!
//! The engine composes the store primitives into the differential
//! synchronization cycle for one server and many clients:
//!
//! - [`ServerSyncEngine::diff`] turns document changes into a queued edit
//!   for one client and advances that client's shadow
//! - [`ServerSyncEngine::patch`] applies a client's patch message, in
//!   order, to the shadow and the document
//! - [`ServerSyncEngine::restore_backup`] rolls a session back to its
//!   backup shadow when the versions or checksums show divergence
//!
//! The engine never decides when to run a cycle; callers drive it.

use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashSet;
use diffsync_core::{
    BackupShadowDocument, Document, Edit, PatchMessage, SessionId, ShadowDocument, Subscriber,
    Synchronizer,
};
use diffsync_store::DataStore;
use tracing::{debug, info, instrument, warn};

use crate::error::{SyncError, SyncResult};
use crate::subscribers::SubscriberRegistry;

/// Observable synchronization state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No edits awaiting acknowledgement
    Synced,
    /// Edits queued for the client and not yet acknowledged
    Pending,
    /// The last patch diverged and the session was rolled back
    Diverged,
}

/// Why a patch message was not applied in full
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divergence {
    /// The edit's versions do not follow the shadow's
    OutOfSequence {
        expected_client_version: u64,
        expected_server_version: u64,
        client_version: u64,
        server_version: u64,
    },
    /// Applying the edit to the shadow produced different content than the
    /// client declared
    ChecksumMismatch {
        server_version: u64,
        client_version: u64,
        expected: String,
        actual: String,
    },
}

/// Result of applying a patch message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Every edit was either applied or skipped as a duplicate
    Applied { applied: usize, skipped: usize },
    /// An edit diverged; the session was restored from its backup shadow
    Diverged {
        reason: Divergence,
        applied: usize,
        restored_version: u64,
    },
}

impl PatchOutcome {
    /// Whether the message diverged
    pub fn is_diverged(&self) -> bool {
        matches!(self, PatchOutcome::Diverged { .. })
    }
}

/// Differential synchronization engine for the server side
///
/// Generic over the content type `T`, the [`Synchronizer`] `S` that diffs
/// and patches it, and the [`DataStore`] that holds all state. The engine
/// itself only tracks which sessions are currently diverged.
pub struct ServerSyncEngine<T, S, St: ?Sized> {
    synchronizer: S,
    store: Arc<St>,
    diverged: DashSet<SessionId>,
    _content: PhantomData<fn() -> T>,
}

impl<T, S, St> ServerSyncEngine<T, S, St>
where
    T: Clone + Send + Sync,
    S: Synchronizer<T>,
    St: DataStore<T, S::Diff> + ?Sized,
{
    /// Create an engine over a shared store
    pub fn new(synchronizer: S, store: Arc<St>) -> Self {
        Self {
            synchronizer,
            store,
            diverged: DashSet::new(),
            _content: PhantomData,
        }
    }

    /// The backing store
    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    /// The synchronizer in use
    pub fn synchronizer(&self) -> &S {
        &self.synchronizer
    }

    /// Register a client for a document
    ///
    /// Saves `document` unless a document with its id already exists, in
    /// which case the stored one wins. Then seeds the session's shadow at
    /// versions 0/0 from the stored content, with a backup at version 0.
    /// An existing shadow is returned untouched.
    pub fn add_document(&self, document: Document<T>, client_id: &str) -> ShadowDocument<T> {
        let document_id = document.id.clone();
        if self.store.save_document(document.clone()) {
            info!(document_id = %document_id, client_id, "Created document");
        }

        if let Some(shadow) = self.store.shadow_document(&document_id, client_id) {
            debug!(document_id = %document_id, client_id, "Session already seeded");
            return shadow;
        }

        let current = self.store.document(&document_id).unwrap_or(document);
        let shadow = ShadowDocument::new(current.for_client(client_id), 0, 0);
        self.store.save_shadow_document(shadow.clone());
        self.store
            .save_backup_shadow_document(BackupShadowDocument::of(&shadow));
        info!(document_id = %document_id, client_id, "Seeded session shadow");
        shadow
    }

    /// Diff the document against the client's shadow and queue the edit
    ///
    /// The edit is stamped with the shadow's versions and the checksum of
    /// the document content. The shadow then moves to the document content
    /// with its server version incremented.
    #[instrument(skip(self))]
    pub fn diff(&self, document_id: &str, client_id: &str) -> SyncResult<Edit<S::Diff>> {
        let document = self.document(document_id)?;
        let shadow = self.shadow(document_id, client_id)?;

        let diff = self
            .synchronizer
            .diff(&shadow.document.content, &document.content);
        let edit = Edit::new(document_id, client_id, diff)
            .with_client_version(shadow.client_version)
            .with_server_version(shadow.server_version)
            .with_checksum(self.synchronizer.checksum(&document.content));
        self.store.save_edits(edit.clone(), document_id, client_id);

        let server_version = shadow.server_version + 1;
        let advanced = ShadowDocument {
            server_version,
            ..shadow.with_content(document.content)
        };
        self.store.save_shadow_document(advanced);

        debug!(
            client_version = edit.client_version,
            server_version = edit.server_version,
            "Queued server edit"
        );
        Ok(edit)
    }

    /// Diff and assemble every pending edit for the client into a message
    pub fn diffs(&self, document_id: &str, client_id: &str) -> SyncResult<PatchMessage<S::Diff>> {
        self.diff(document_id, client_id)?;
        let session = SessionId::new(document_id, client_id);
        Ok(PatchMessage::from_edits(
            &session,
            self.store.edits(document_id, client_id),
        ))
    }

    /// Apply a client's patch message
    ///
    /// Edits are applied strictly in order:
    ///
    /// - an edit with an older client version is a duplicate and skipped
    /// - an edit with an older server version means the client lost server
    ///   edits; if the backup shadow is at that version the session is
    ///   rolled back to it and processing continues
    /// - any other version mismatch, or a checksum mismatch after applying
    ///   the edit to the shadow, rolls the session back to its backup and
    ///   stops processing
    ///
    /// Each applied edit acknowledges the server edits the client has seen,
    /// then commits the document, the shadow, and a backup of that shadow
    /// together. A divergence later in the message rolls back to the last
    /// applied edit, never behind it, so a resent edit the document already
    /// holds is skipped as a duplicate.
    ///
    /// # Errors
    ///
    /// Fails if the document or session is unknown, or if the synchronizer
    /// rejects a diff.
    #[instrument(skip(self, message), fields(
        document_id = %message.document_id,
        client_id = %message.client_id,
        edits = message.edits.len(),
    ))]
    pub fn patch(&self, message: &PatchMessage<S::Diff>) -> SyncResult<PatchOutcome> {
        let document_id = message.document_id.as_str();
        let client_id = message.client_id.as_str();
        let session = message.session_id();

        let mut shadow = self.shadow(document_id, client_id)?;
        let mut applied = 0;
        let mut skipped = 0;

        for edit in &message.edits {
            if edit.client_version < shadow.client_version {
                debug!(
                    client_version = edit.client_version,
                    "Skipping already applied edit"
                );
                skipped += 1;
                continue;
            }

            if edit.server_version < shadow.server_version {
                match self.store.backup_shadow_document(document_id, client_id) {
                    Some(backup) if backup.version == edit.server_version => {
                        warn!(
                            shadow_version = shadow.server_version,
                            backup_version = backup.version,
                            "Client lost server edits, rolling back to backup shadow"
                        );
                        shadow = backup.restore();
                        self.store.save_shadow_document(shadow.clone());
                        self.store.remove_edits(document_id, client_id);
                    }
                    _ => {}
                }
            }

            if edit.client_version != shadow.client_version
                || edit.server_version != shadow.server_version
            {
                let reason = Divergence::OutOfSequence {
                    expected_client_version: shadow.client_version,
                    expected_server_version: shadow.server_version,
                    client_version: edit.client_version,
                    server_version: edit.server_version,
                };
                return self.diverge(&session, reason, applied);
            }

            self.acknowledge(document_id, client_id, edit.server_version);

            let patched_shadow = self
                .synchronizer
                .patch(&shadow.document.content, &edit.diff)?;
            let actual = self.synchronizer.checksum(&patched_shadow);
            if actual != edit.checksum {
                let reason = Divergence::ChecksumMismatch {
                    server_version: edit.server_version,
                    client_version: edit.client_version,
                    expected: edit.checksum.clone(),
                    actual,
                };
                return self.diverge(&session, reason, applied);
            }

            let document = self.document(document_id)?;
            let patched_document = self.synchronizer.patch(&document.content, &edit.diff)?;
            self.store
                .update_document(Document::new(document_id, patched_document));

            shadow = ShadowDocument {
                client_version: shadow.client_version + 1,
                ..shadow.with_content(patched_shadow)
            };
            self.store.save_shadow_document(shadow.clone());
            self.store
                .save_backup_shadow_document(BackupShadowDocument::of(&shadow));
            applied += 1;
        }

        self.diverged.remove(&session);

        debug!(applied, skipped, "Patch message applied");
        Ok(PatchOutcome::Applied { applied, skipped })
    }

    /// Roll a session back to its backup shadow
    ///
    /// The current shadow is discarded and replaced by the backup's shadow
    /// at the backup's version, and every pending edit is dropped, so the
    /// next [`diff`](Self::diff) resends from the backup state.
    ///
    /// # Errors
    ///
    /// Fails if the session has no backup shadow.
    pub fn restore_backup(&self, document_id: &str, client_id: &str) -> SyncResult<ShadowDocument<T>> {
        let backup = self
            .store
            .backup_shadow_document(document_id, client_id)
            .ok_or_else(|| SyncError::BackupNotFound(SessionId::new(document_id, client_id)))?;

        let restored = backup.restore();
        self.store.save_shadow_document(restored.clone());
        self.store.remove_edits(document_id, client_id);
        info!(
            document_id,
            client_id,
            server_version = restored.server_version,
            client_version = restored.client_version,
            "Restored shadow from backup"
        );
        Ok(restored)
    }

    /// Current state of a session
    pub fn session_state(&self, document_id: &str, client_id: &str) -> SessionState {
        if self.diverged.contains(&SessionId::new(document_id, client_id)) {
            SessionState::Diverged
        } else if self.store.edits(document_id, client_id).is_empty() {
            SessionState::Synced
        } else {
            SessionState::Pending
        }
    }

    /// Send every subscriber of a document, except the originating client,
    /// its pending edits
    ///
    /// Returns the number of subscribers that accepted delivery. Delivery
    /// failures and subscribers without a session are logged and skipped.
    pub async fn notify_subscribers<Sub>(
        &self,
        registry: &SubscriberRegistry<S::Diff, Sub>,
        document_id: &str,
        origin_client_id: &str,
    ) -> SyncResult<usize>
    where
        Sub: Subscriber<S::Diff>,
    {
        let mut delivered = 0;
        for subscriber in registry.subscribers(document_id) {
            let client_id = subscriber.client_id();
            if client_id == origin_client_id {
                continue;
            }

            let message = match self.diffs(document_id, client_id) {
                Ok(message) => message,
                Err(SyncError::SessionNotFound(session)) => {
                    warn!(session = %session, "Subscriber has no session, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match subscriber.patched(message).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(document_id, client_id, error = %e, "Failed to deliver patch"),
            }
        }
        Ok(delivered)
    }

    fn document(&self, document_id: &str) -> SyncResult<Document<T>> {
        self.store
            .document(document_id)
            .ok_or_else(|| SyncError::DocumentNotFound(document_id.to_string()))
    }

    fn shadow(&self, document_id: &str, client_id: &str) -> SyncResult<ShadowDocument<T>> {
        self.store
            .shadow_document(document_id, client_id)
            .ok_or_else(|| SyncError::SessionNotFound(SessionId::new(document_id, client_id)))
    }

    /// Purge the queued server edits the client has already applied
    ///
    /// An incoming edit computed against server version `n` has seen every
    /// server edit below `n`.
    fn acknowledge(&self, document_id: &str, client_id: &str, server_version: u64) {
        let acknowledged = self
            .store
            .edits(document_id, client_id)
            .into_iter()
            .take_while(|edit| edit.server_version < server_version)
            .last();
        if let Some(edit) = acknowledged {
            self.store.remove_edit(&edit, document_id, client_id);
        }
    }

    fn diverge(
        &self,
        session: &SessionId,
        reason: Divergence,
        applied: usize,
    ) -> SyncResult<PatchOutcome> {
        warn!(session = %session, ?reason, "Session diverged");
        let restored = self.restore_backup(session.document_id(), session.client_id())?;
        self.diverged.insert(session.clone());
        Ok(PatchOutcome::Diverged {
            reason,
            applied,
            restored_version: restored.server_version,
        })
    }
}
