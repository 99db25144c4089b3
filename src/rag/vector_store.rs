use std::sync::Arc;

use super::splitter::TextChunk;
use super::store::{ChunkSearchResult, StoredChunk, VectorIndex};
use crate::core::errors::RecommenderError;
use crate::llm::EmbeddingProvider;

/// A vector index paired with the embedder that produced it.
///
/// Queries are embedded with the same provider before comparison, so the
/// handle must be built with the embedding configuration used at build time.
#[derive(Clone)]
pub struct VectorStore {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorStore {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    pub fn collection(&self) -> &str {
        self.index.collection()
    }

    /// Persists pre-embedded chunks and records the embedding model.
    pub async fn insert_embedded(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<usize, RecommenderError> {
        let inserted = items.len();
        self.index.insert_batch(items).await?;
        self.index.set_embedding_model(self.embedder.model()).await?;
        Ok(inserted)
    }

    /// Top-`k` chunks for a free-text query, highest similarity first.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ChunkSearchResult>, RecommenderError> {
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_embedding = vectors.pop().ok_or_else(|| {
            RecommenderError::Provider("embedding provider returned no vector".to_string())
        })?;
        self.index.search(&query_embedding, k).await
    }

    pub async fn count(&self) -> Result<usize, RecommenderError> {
        self.index.count().await
    }

    pub async fn recorded_embedding_model(&self) -> Result<Option<String>, RecommenderError> {
        self.index.embedding_model().await
    }
}

/// Embeds `chunks` in batches of `batch_size`.
///
/// Nothing is written here, so a provider failure leaves no partial index.
pub async fn embed_chunks(
    embedder: &dyn EmbeddingProvider,
    chunks: Vec<TextChunk>,
    source: &str,
    batch_size: usize,
) -> Result<Vec<(StoredChunk, Vec<f32>)>, RecommenderError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = batch_size.max(1);
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let mut embeddings = Vec::with_capacity(texts.len());
    for (batch_no, batch) in texts.chunks(batch_size).enumerate() {
        tracing::debug!(
            "Embedding batch {} ({} chunks) with {}",
            batch_no + 1,
            batch.len(),
            embedder.model()
        );
        let vectors = embedder.embed(batch).await?;
        if vectors.len() != batch.len() {
            return Err(RecommenderError::Provider(format!(
                "embedding provider returned {} vectors for {} inputs",
                vectors.len(),
                batch.len()
            )));
        }
        embeddings.extend(vectors);
    }

    Ok(chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| {
            (
                StoredChunk {
                    chunk_id: uuid::Uuid::new_v4().to_string(),
                    content: chunk.text,
                    source: source.to_string(),
                    metadata: Some(chunk.metadata),
                },
                embedding,
            )
        })
        .collect())
}
