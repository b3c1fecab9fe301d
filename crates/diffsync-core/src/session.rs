//! Session identity
//!
//! A session is one client's synchronization relationship with one
//! document. Shadows, backup shadows, and pending-edit queues are all keyed
//! by [`SessionId`]; documents are keyed by their id alone.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Composite `(document_id, client_id)` key
///
/// Two ids are equal iff both fields are equal.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[display("{document_id}/{client_id}")]
pub struct SessionId {
    document_id: String,
    client_id: String,
}

impl SessionId {
    /// Create a session id
    ///
    /// # Panics
    ///
    /// Panics if either id is empty. An empty id is a caller bug, not a
    /// runtime condition.
    pub fn new(document_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        let document_id = document_id.into();
        let client_id = client_id.into();
        assert!(!document_id.is_empty(), "session document id must not be empty");
        assert!(!client_id.is_empty(), "session client id must not be empty");
        Self {
            document_id,
            client_id,
        }
    }

    /// The document half of the key
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// The client half of the key
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}
