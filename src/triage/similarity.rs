//! Similarity index — embedding plus nearest-neighbor lookup.
//!
//! Nothing raises past this boundary: an embedding failure yields an
//! all-zero vector of the expected length, and a store failure yields an
//! empty neighbor list. Similarity is a secondary signal — when it degrades,
//! the confidence estimator simply gets less to work with.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::embedding::EmbeddingProvider;
use crate::store::{SimilarMessage, VectorStore};
use crate::triage::types::{Category, Message};

/// Body prefix included in the embedded text.
const MAX_EMBED_BODY_CHARS: usize = 1000;

/// Embedding and nearest-neighbor lookup over previously-seen messages.
pub struct SimilarityIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    embed_timeout: Duration,
    lookup_timeout: Duration,
    limit: usize,
}

impl SimilarityIndex {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        embed_timeout: Duration,
        lookup_timeout: Duration,
        limit: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            embed_timeout,
            lookup_timeout,
            limit,
        }
    }

    /// Embed a message's subject + body prefix.
    ///
    /// Any failure or timeout yields an all-zero vector of the expected
    /// dimensionality — never an error, never an absent vector.
    pub async fn embed_message(&self, message: &Message) -> Vec<f32> {
        let body_preview: String = message.body_text.chars().take(MAX_EMBED_BODY_CHARS).collect();
        let content = format!("{} {}", message.subject, body_preview);

        match tokio::time::timeout(self.embed_timeout, self.embedder.embed(&content)).await {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => {
                warn!(id = %message.id, error = %e, "Embedding failed, using zero vector");
                vec![0.0; self.embedder.dimensions()]
            }
            Err(_) => {
                warn!(id = %message.id, timeout = ?self.embed_timeout, "Embedding timed out, using zero vector");
                vec![0.0; self.embedder.dimensions()]
            }
        }
    }

    /// Write a message's embedding into the store.
    ///
    /// Failures are logged and swallowed; a message the store never learns
    /// about just won't show up as anyone's neighbor.
    pub async fn remember(&self, id: &str, category: Category, embedding: Vec<f32>) {
        match tokio::time::timeout(self.lookup_timeout, self.store.put(id, category, embedding))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(id = %id, error = %e, "Vector store write failed"),
            Err(_) => warn!(id = %id, "Vector store write timed out"),
        }
    }

    /// The stored messages most similar to `message_id`.
    ///
    /// Excludes the message itself and anything without an embedding.
    /// Store errors, an unreachable store, or a timeout all yield an empty
    /// list.
    pub async fn find_similar(&self, message_id: &str) -> Vec<SimilarMessage> {
        match tokio::time::timeout(self.lookup_timeout, self.store.nearest(message_id, self.limit))
            .await
        {
            Ok(Ok(neighbors)) => neighbors,
            Ok(Err(e)) => {
                warn!(id = %message_id, error = %e, "Similarity lookup failed");
                Vec::new()
            }
            Err(_) => {
                warn!(id = %message_id, timeout = ?self.lookup_timeout, "Similarity lookup timed out");
                Vec::new()
            }
        }
    }
}
