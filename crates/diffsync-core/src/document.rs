//! Document model
//!
//! - [`Document`]: the authoritative content for a document id
//! - [`ClientDocument`]: a document copy that belongs to one client
//! - [`ShadowDocument`]: the last state the server and one client agree on
//! - [`BackupShadowDocument`]: an earlier shadow retained for rollback
//!
//! All of these are plain values. A new revision replaces the old value
//! wholesale in the store.

use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Authoritative document content, shared by all clients of `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document<T> {
    /// Document id
    pub id: String,
    /// Current content
    pub content: T,
}

impl<T> Document<T> {
    /// Create a new document
    pub fn new(id: impl Into<String>, content: T) -> Self {
        Self {
            id: id.into(),
            content,
        }
    }

    /// Tag this document with a client id
    pub fn for_client(self, client_id: impl Into<String>) -> ClientDocument<T> {
        ClientDocument::new(self.id, client_id, self.content)
    }
}

/// A document copy owned by one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDocument<T> {
    /// Document id
    pub id: String,
    /// Client the copy belongs to
    pub client_id: String,
    /// Content of the copy
    pub content: T,
}

impl<T> ClientDocument<T> {
    /// Create a new client document
    pub fn new(id: impl Into<String>, client_id: impl Into<String>, content: T) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            content,
        }
    }

    /// The session this copy belongs to
    pub fn session_id(&self) -> SessionId {
        SessionId::new(self.id.as_str(), self.client_id.as_str())
    }
}

/// Per-client working copy plus version counters
///
/// `client_version` counts edits the server has accepted from the client.
/// `server_version` counts edits the server has sent to the client. Neither
/// ever decreases except through an explicit restore from a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowDocument<T> {
    /// The shadowed client document
    pub document: ClientDocument<T>,
    /// Edits accepted from the client
    pub client_version: u64,
    /// Edits sent to the client
    pub server_version: u64,
}

impl<T> ShadowDocument<T> {
    /// Create a new shadow
    pub fn new(document: ClientDocument<T>, client_version: u64, server_version: u64) -> Self {
        Self {
            document,
            client_version,
            server_version,
        }
    }

    /// The session this shadow belongs to
    pub fn session_id(&self) -> SessionId {
        self.document.session_id()
    }

    /// Replace the shadowed content, keeping ids and versions
    pub fn with_content(mut self, content: T) -> Self {
        self.document.content = content;
        self
    }
}

/// A point-in-time copy of a shadow
///
/// `version` is the server version the copy was taken at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupShadowDocument<T> {
    /// The retained shadow
    pub shadow: ShadowDocument<T>,
    /// Server version of the retained shadow
    pub version: u64,
}

impl<T: Clone> BackupShadowDocument<T> {
    /// Back up a shadow at its current server version
    pub fn of(shadow: &ShadowDocument<T>) -> Self {
        Self {
            shadow: shadow.clone(),
            version: shadow.server_version,
        }
    }
}

impl<T> BackupShadowDocument<T> {
    /// Create a backup with an explicit version
    pub fn new(shadow: ShadowDocument<T>, version: u64) -> Self {
        Self { shadow, version }
    }

    /// The session this backup belongs to
    pub fn session_id(&self) -> SessionId {
        self.shadow.session_id()
    }

    /// The shadow this backup restores to
    ///
    /// The restored shadow carries `version` as its server version.
    pub fn restore(self) -> ShadowDocument<T> {
        ShadowDocument {
            server_version: self.version,
            ..self.shadow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_for_client() {
        let doc = Document::new("1234", "fletch".to_string());
        let client_doc = doc.for_client("client1");
        assert_eq!(client_doc.id, "1234");
        assert_eq!(client_doc.client_id, "client1");
        assert_eq!(client_doc.content, "fletch");
        assert_eq!(client_doc.session_id(), SessionId::new("1234", "client1"));
    }

    #[test]
    fn test_shadow_with_content_keeps_versions() {
        let shadow = ShadowDocument::new(ClientDocument::new("d", "c", 1u32), 3, 7);
        let updated = shadow.with_content(2);
        assert_eq!(updated.document.content, 2);
        assert_eq!(updated.client_version, 3);
        assert_eq!(updated.server_version, 7);
    }

    #[test]
    fn test_backup_of_shadow_takes_server_version() {
        let shadow = ShadowDocument::new(ClientDocument::new("d", "c", "x"), 2, 5);
        let backup = BackupShadowDocument::of(&shadow);
        assert_eq!(backup.version, 5);
        assert_eq!(backup.session_id(), shadow.session_id());
    }

    #[test]
    fn test_backup_restore_uses_backup_version() {
        let shadow = ShadowDocument::new(ClientDocument::new("d", "c", "old"), 1, 9);
        let restored = BackupShadowDocument::new(shadow, 3).restore();
        assert_eq!(restored.server_version, 3);
        assert_eq!(restored.client_version, 1);
        assert_eq!(restored.document.content, "old");
    }
}
