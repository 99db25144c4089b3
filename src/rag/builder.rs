//! Builds and loads the persisted vector store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::ReaderBuilder;
use serde_json::json;

use super::splitter::{Document, TextSplitter};
use super::sqlite::SqliteVectorIndex;
use super::vector_store::{embed_chunks, VectorStore};
use crate::core::config::Settings;
use crate::core::errors::RecommenderError;
use crate::llm::EmbeddingProvider;

pub struct VectorStoreBuilder {
    persist_directory: PathBuf,
    collection_name: String,
    batch_size: usize,
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: TextSplitter,
}

impl VectorStoreBuilder {
    pub fn new(settings: &Settings, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            persist_directory: settings.chroma_dir.clone(),
            collection_name: settings.chroma_collection.clone(),
            batch_size: settings.embedding_batch_size,
            embedder,
            splitter: TextSplitter::default(),
        }
    }

    pub fn persist_directory(&self) -> &Path {
        &self.persist_directory
    }

    /// Loads the processed CSV, chunks and embeds it, and persists the index.
    ///
    /// Rows are appended to the collection; clearing the persistence
    /// directory beforehand is the caller's job.
    pub async fn create(&self, processed_csv: &Path) -> Result<VectorStore, RecommenderError> {
        if !processed_csv.exists() {
            return Err(RecommenderError::NotFound(format!(
                "CSV file not found: {}",
                processed_csv.display()
            )));
        }

        tracing::info!("Loading CSV from {}", processed_csv.display());
        let documents = load_documents(processed_csv)?;
        tracing::info!("Loaded {} documents", documents.len());

        tracing::info!(
            "Splitting documents (chunk_size={}, overlap={})",
            self.splitter.chunk_size(),
            self.splitter.chunk_overlap()
        );
        let chunks = self.splitter.split_documents(&documents);
        tracing::info!("Created {} text chunks", chunks.len());

        let source = processed_csv.to_string_lossy().to_string();
        let items = embed_chunks(self.embedder.as_ref(), chunks, &source, self.batch_size).await?;

        tokio::fs::create_dir_all(&self.persist_directory).await?;
        let index = SqliteVectorIndex::open(&self.persist_directory, &self.collection_name).await?;
        let store = VectorStore::new(Arc::new(index), self.embedder.clone());
        let inserted = store.insert_embedded(items).await?;

        tracing::info!(
            "Vector store created and persisted at '{}' (collection: {}, {} chunks)",
            self.persist_directory.display(),
            self.collection_name,
            inserted
        );
        Ok(store)
    }

    /// Opens the persisted index without re-embedding anything.
    pub async fn load(&self) -> Result<VectorStore, RecommenderError> {
        if !self.persist_directory.exists() {
            return Err(RecommenderError::NotFound(format!(
                "No vector store found at {}. Run build first.",
                self.persist_directory.display()
            )));
        }

        tracing::info!(
            "Loading existing vector store from '{}'",
            self.persist_directory.display()
        );
        let index = SqliteVectorIndex::open(&self.persist_directory, &self.collection_name).await?;
        let store = VectorStore::new(Arc::new(index), self.embedder.clone());

        match store.recorded_embedding_model().await? {
            Some(recorded) if recorded != self.embedder.model() => {
                tracing::warn!(
                    "Collection '{}' was built with embedding model '{}' but '{}' is configured; similarity results will be meaningless",
                    self.collection_name,
                    recorded,
                    self.embedder.model()
                );
            }
            _ => {}
        }

        tracing::info!("Vector store loaded successfully");
        Ok(store)
    }
}

/// Reads a CSV into one document per row.
///
/// Each document's text holds one `column: value` line per column; metadata
/// records the source path and the 0-based row number.
pub fn load_documents(path: &Path) -> Result<Vec<Document>, RecommenderError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let source = path.to_string_lossy().to_string();

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let content = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| format!("{}: {}", column.trim(), value.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        documents.push(Document {
            content,
            metadata: json!({ "source": source, "row": row }),
        });
    }

    Ok(documents)
}
