//! Vector store abstraction with an in-memory reference backend.
//!
//! The store holds one vector per id with an opaque JSON metadata payload
//! and answers approximate nearest-neighbor queries. The in-memory backend
//! is exact brute-force cosine distance, which is plenty for tool sets in
//! the hundreds; swap in a real index behind the same trait for more.

use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// One nearest-neighbor query hit.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    /// Id the vector was upserted under.
    pub id: String,
    /// Metadata stored with the vector.
    pub metadata: Value,
    /// Cosine distance to the query vector; `similarity = 1 - distance`.
    pub distance: f32,
}

/// Keyed vector storage with nearest-neighbor lookup.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the vector stored under `id`.
    async fn upsert(&self, id: &str, vector: Vec<f32>, metadata: Value) -> Result<()>;

    /// Return up to `k` stored vectors closest to `vector`, nearest first.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>>;

    /// Remove the vector stored under `id`, if any.
    async fn delete(&self, id: &str) -> Result<()>;
}

struct Entry {
    vector: Vec<f32>,
    metadata: Value,
}

/// Brute-force in-memory vector store.
pub struct InMemoryVectorStore {
    dimension: usize,
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryVectorStore {
    /// Create an empty store for vectors of the given dimensionality.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored vectors.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Cosine distance between two equal-length vectors, in [0, 2].
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, id: &str, vector: Vec<f32>, metadata: Value) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.entries
            .write()
            .await
            .insert(id.to_string(), Entry { vector, metadata });
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>> {
        if vector.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let entries = self.entries.read().await;
        let mut matches: Vec<VectorMatch> = entries
            .iter()
            .map(|(id, entry)| VectorMatch {
                id: id.clone(),
                metadata: entry.metadata.clone(),
                distance: cosine_distance(vector, &entry.vector),
            })
            .collect();
        // Ties broken by id so results are stable across runs.
        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(k);
        Ok(matches)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.entries.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_and_query_orders_by_distance() {
        let store = InMemoryVectorStore::new(2);
        store.upsert("x", vec![1.0, 0.0], json!({"n": 1})).await.unwrap();
        store.upsert("y", vec![0.0, 1.0], json!({"n": 2})).await.unwrap();
        store.upsert("z", vec![0.9, 0.1], json!({"n": 3})).await.unwrap();

        let matches = store.query(&[1.0, 0.0], 2).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "x");
        assert!(matches[0].distance < 1e-6);
        assert_eq!(matches[1].id, "z");
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let store = InMemoryVectorStore::new(2);
        store.upsert("x", vec![1.0, 0.0], json!({})).await.unwrap();
        store.upsert("x", vec![0.0, 1.0], json!({})).await.unwrap();

        assert_eq!(store.len().await, 1);
        let matches = store.query(&[0.0, 1.0], 1).await.unwrap();
        assert!(matches[0].distance < 1e-6);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = InMemoryVectorStore::new(3);
        let err = store.upsert("x", vec![1.0], json!({})).await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch { expected: 3, actual: 1 }
        ));
    }

    #[tokio::test]
    async fn test_zero_vector_distance_is_neutral() {
        let store = InMemoryVectorStore::new(2);
        store.upsert("x", vec![0.0, 0.0], json!({})).await.unwrap();

        let matches = store.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(matches[0].distance, 1.0);
    }
}
