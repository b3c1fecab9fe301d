//! Edits and patch messages
//!
//! An [`Edit`] moves a shadow from one version to the next. A
//! [`PatchMessage`] is the ordered batch of edits exchanged between peers
//! for one session.
//!
//! Both types derive serde with the patch wire field names so any
//! serde format can round-trip them:
//!
//! ```json
//! {
//!   "msgType": "patch",
//!   "id": "12345",
//!   "clientId": "client1",
//!   "edits": [
//!     { "id": "12345", "clientId": "client1", "clientVersion": 0,
//!       "serverVersion": 0, "checksum": "...", "diffs": ... }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// One versioned change plus the checksum of the resulting content
///
/// The diff payload is opaque here; only the [`Synchronizer`] that produced
/// it knows how to apply it.
///
/// [`Synchronizer`]: crate::Synchronizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit<D> {
    /// Document the edit applies to
    #[serde(rename = "id")]
    pub document_id: String,
    /// Client session the edit belongs to
    pub client_id: String,
    /// Client version the edit was computed against
    pub client_version: u64,
    /// Server version the edit was computed against
    pub server_version: u64,
    /// Checksum of the content after applying the edit
    pub checksum: String,
    /// Opaque diff payload
    #[serde(rename = "diffs")]
    pub diff: D,
}

impl<D> Edit<D> {
    /// Create an edit at versions 0/0 with an empty checksum
    pub fn new(document_id: impl Into<String>, client_id: impl Into<String>, diff: D) -> Self {
        Self {
            document_id: document_id.into(),
            client_id: client_id.into(),
            client_version: 0,
            server_version: 0,
            checksum: String::new(),
            diff,
        }
    }

    /// Set the client version
    pub fn with_client_version(mut self, version: u64) -> Self {
        self.client_version = version;
        self
    }

    /// Set the server version
    pub fn with_server_version(mut self, version: u64) -> Self {
        self.server_version = version;
        self
    }

    /// Set the checksum
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = checksum.into();
        self
    }

    /// The session this edit belongs to
    pub fn session_id(&self) -> SessionId {
        SessionId::new(self.document_id.as_str(), self.client_id.as_str())
    }
}

/// Ordered batch of edits for one `(document, client)` session
///
/// Edits are ordered oldest first and must be applied in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msgType", rename = "patch", rename_all = "camelCase")]
pub struct PatchMessage<D> {
    /// Document the edits apply to
    #[serde(rename = "id")]
    pub document_id: String,
    /// Client session the edits belong to
    pub client_id: String,
    /// Edits, oldest first
    pub edits: Vec<Edit<D>>,
}

impl<D> PatchMessage<D> {
    /// Create a patch message
    pub fn new(
        document_id: impl Into<String>,
        client_id: impl Into<String>,
        edits: Vec<Edit<D>>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            client_id: client_id.into(),
            edits,
        }
    }

    /// Assemble a patch message for a session from its pending edits
    pub fn from_edits(session: &SessionId, edits: Vec<Edit<D>>) -> Self {
        Self::new(session.document_id(), session.client_id(), edits)
    }

    /// The session this message is addressed to
    pub fn session_id(&self) -> SessionId {
        SessionId::new(self.document_id.as_str(), self.client_id.as_str())
    }

    /// Number of edits in the message
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Whether the message carries no edits
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}
