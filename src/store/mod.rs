//! Vector store — nearest-neighbor lookup over message embeddings.
//!
//! The store is an external collaborator behind the [`VectorStore`] trait;
//! [`MemoryVectorStore`] is the in-process reference implementation used by
//! tests and single-node deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::triage::types::Category;

/// A stored message returned from a similarity lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarMessage {
    /// Message id.
    pub id: String,
    /// Category the message was classified as when stored.
    pub category: Category,
    /// Cosine distance to the query message (0 = identical direction).
    pub distance: f32,
}

/// Backend-agnostic vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the embedding for a message.
    async fn put(
        &self,
        id: &str,
        category: Category,
        embedding: Vec<f32>,
    ) -> Result<(), StoreError>;

    /// The `k` nearest neighbors of the message with `id`, by ascending
    /// cosine distance, excluding the message itself.
    ///
    /// An unknown `id` — or one whose stored embedding is unusable — is a
    /// first-class empty result, not an error.
    async fn nearest(&self, id: &str, k: usize) -> Result<Vec<SimilarMessage>, StoreError>;
}

struct StoredVector {
    category: Category,
    embedding: Vec<f32>,
}

/// In-memory vector store with cosine-distance search.
#[derive(Default)]
pub struct MemoryVectorStore {
    entries: RwLock<HashMap<String, StoredVector>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn put(
        &self,
        id: &str,
        category: Category,
        embedding: Vec<f32>,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            id.to_string(),
            StoredVector {
                category,
                embedding,
            },
        );
        Ok(())
    }

    async fn nearest(&self, id: &str, k: usize) -> Result<Vec<SimilarMessage>, StoreError> {
        let entries = self.entries.read().await;

        let Some(query) = entries.get(id) else {
            return Ok(Vec::new());
        };
        // An all-zero vector is the embedding endpoint's failure sentinel;
        // treat it the same as a missing embedding.
        if norm(&query.embedding) == 0.0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<SimilarMessage> = entries
            .iter()
            .filter(|(other_id, stored)| other_id.as_str() != id && norm(&stored.embedding) > 0.0)
            .map(|(other_id, stored)| SimilarMessage {
                id: other_id.clone(),
                category: stored.category,
                distance: cosine_distance(&query.embedding, &stored.embedding),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine distance between two vectors; 1.0 when either has zero norm.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norms = norm(a) * norm(b);
    if norms == 0.0 {
        return 1.0;
    }
    1.0 - dot / norms
}
