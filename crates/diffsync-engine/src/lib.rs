//! # diffsync Engine
//!
//! Server-side differential synchronization over a [`DataStore`].
//!
//! The engine keeps one authoritative [`Document`] per document id and one
//! shadow per `(document, client)` session. Changes flow in both directions
//! as [`PatchMessage`]s:
//!
//! ```text
//! client edit ──► patch() ──► shadow + document updated
//!                                   │
//! subscribers ◄── notify_subscribers() ◄── diff() per other client
//! ```
//!
//! ## Recovery
//!
//! Every fully applied patch message commits a backup shadow. When an
//! incoming edit shows that the client lost server edits, or that its
//! content diverged, the session is rolled back to that backup and the
//! pending server edits are dropped so the next diff resends from a state
//! both sides agree on.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use diffsync_core::{Document, SpliceSynchronizer};
//! use diffsync_engine::ServerSyncEngine;
//! use diffsync_store::InMemoryDataStore;
//!
//! let store = Arc::new(InMemoryDataStore::new());
//! let engine = ServerSyncEngine::new(SpliceSynchronizer, store);
//! engine.add_document(Document::new("1234", "fletch".to_string()), "client1");
//! let outcome = engine.patch(&message)?;
//! ```
//!
//! [`DataStore`]: diffsync_store::DataStore
//! [`Document`]: diffsync_core::Document
//! [`PatchMessage`]: diffsync_core::PatchMessage

pub mod engine;
pub mod error;
pub mod subscribers;

pub use engine::{Divergence, PatchOutcome, ServerSyncEngine, SessionState};
pub use error::{SyncError, SyncResult};
pub use subscribers::SubscriberRegistry;
