//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `TextSplitter`: Separator-based chunking with overlap
//! - `SqliteVectorIndex`: Persisted embeddings with cosine search
//! - `VectorStoreBuilder`: Builds a store from the processed CSV or loads an existing one

mod builder;
mod splitter;
mod sqlite;
mod store;
mod vector_store;

pub use builder::{load_documents, VectorStoreBuilder};
pub use splitter::{Document, TextChunk, TextSplitter};
pub use sqlite::{SqliteVectorIndex, INDEX_FILE};
pub use store::{ChunkSearchResult, StoredChunk, VectorIndex};
pub use vector_store::VectorStore;
