//! VectorIndex trait — abstract interface for persisted vector indexes.
//!
//! The primary implementation is `SqliteVectorIndex` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::RecommenderError;

/// A stored chunk with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source document (processed CSV path).
    pub source: String,
    /// Optional metadata (JSON), e.g. `row` and `chunk_index`.
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// A named collection of (embedding, chunk) pairs.
///
/// Results of [`VectorIndex::search`] are ordered by descending score. The
/// relative order of equal scores is not part of the contract.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Name of the collection this handle reads and writes.
    fn collection(&self) -> &str;

    /// Insert chunks with their embedding vectors in one batch.
    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), RecommenderError>;

    /// Top-`limit` chunks by cosine similarity to the query embedding.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, RecommenderError>;

    /// Number of chunks in the collection.
    async fn count(&self) -> Result<usize, RecommenderError>;

    /// Embedding model recorded when the collection was built.
    async fn embedding_model(&self) -> Result<Option<String>, RecommenderError>;

    /// Records the embedding model used to build the collection.
    async fn set_embedding_model(&self, model: &str) -> Result<(), RecommenderError>;
}
