//! Per-document subscriber sets
//!
//! Subscribers are deduplicated by client id: subscribing a second
//! subscriber with the same client id replaces the first, whatever transport
//! channel either one uses.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;
use diffsync_core::Subscriber;
use tracing::debug;

/// Subscribers of every document, keyed by document id then client id
pub struct SubscriberRegistry<D, S> {
    documents: DashMap<String, BTreeMap<String, Arc<S>>>,
    _diff: PhantomData<fn() -> D>,
}

impl<D, S> Default for SubscriberRegistry<D, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, S> SubscriberRegistry<D, S> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            _diff: PhantomData,
        }
    }

    /// Number of documents with at least one subscriber
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl<D, S> SubscriberRegistry<D, S>
where
    D: Send + 'static,
    S: Subscriber<D>,
{
    /// Subscribe to a document
    ///
    /// Returns the subscriber previously registered for the same client,
    /// if any.
    pub fn subscribe(&self, document_id: &str, subscriber: S) -> Option<Arc<S>> {
        let client_id = subscriber.client_id().to_string();
        debug!(document_id, client_id = %client_id, "Adding subscriber");
        self.documents
            .entry(document_id.to_string())
            .or_default()
            .insert(client_id, Arc::new(subscriber))
    }

    /// Remove a client's subscription to a document
    pub fn unsubscribe(&self, document_id: &str, client_id: &str) -> Option<Arc<S>> {
        let removed = self
            .documents
            .get_mut(document_id)
            .and_then(|mut subscribers| subscribers.remove(client_id));
        self.documents
            .remove_if(document_id, |_, subscribers| subscribers.is_empty());

        if removed.is_some() {
            debug!(document_id, client_id, "Removed subscriber");
        }
        removed
    }

    /// Snapshot of a document's subscribers, ordered by client id
    pub fn subscribers(&self, document_id: &str) -> Vec<Arc<S>> {
        self.documents
            .get(document_id)
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of subscribers of a document
    pub fn subscriber_count(&self, document_id: &str) -> usize {
        self.documents
            .get(document_id)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffsync_core::{MockSubscriber, Splice};

    type Registry = SubscriberRegistry<Splice, MockSubscriber<Splice>>;

    #[test]
    fn test_subscribe_dedups_by_client_id() {
        let registry = Registry::new();
        let (first, _first_inbox) = MockSubscriber::new("client1");
        let (second, _second_inbox) = MockSubscriber::new("client1");

        assert!(registry.subscribe("doc", first).is_none());
        let replaced = registry.subscribe("doc", second);

        assert!(replaced.is_some());
        assert_eq!(registry.subscriber_count("doc"), 1);
    }

    #[test]
    fn test_subscribers_per_document() {
        let registry = Registry::new();
        let (a, _a) = MockSubscriber::new("client-a");
        let (b, _b) = MockSubscriber::new("client-b");
        let (c, _c) = MockSubscriber::new("client-a");

        registry.subscribe("doc1", a);
        registry.subscribe("doc1", b);
        registry.subscribe("doc2", c);

        let ids: Vec<_> = registry
            .subscribers("doc1")
            .iter()
            .map(|s| s.client_id().to_string())
            .collect();
        assert_eq!(ids, vec!["client-a", "client-b"]);
        assert_eq!(registry.subscriber_count("doc2"), 1);
        assert_eq!(registry.document_count(), 2);
        assert!(registry.subscribers("doc3").is_empty());
    }

    #[test]
    fn test_unsubscribe_last_drops_document() {
        let registry = Registry::new();
        let (a, _a) = MockSubscriber::new("client-a");
        registry.subscribe("doc1", a);

        assert!(registry.unsubscribe("doc1", "client-a").is_some());
        assert!(registry.unsubscribe("doc1", "client-a").is_none());
        assert_eq!(registry.subscriber_count("doc1"), 0);
        assert_eq!(registry.document_count(), 0);
    }
}
