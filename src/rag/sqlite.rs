//! SQLite-backed vector index.
//!
//! Chunks and their embeddings live in a single SQLite file inside the
//! persistence directory; search is brute-force cosine similarity.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, StoredChunk, VectorIndex};
use crate::core::errors::RecommenderError;

/// File name of the index inside the persistence directory.
pub const INDEX_FILE: &str = "index.sqlite3";

pub struct SqliteVectorIndex {
    pool: SqlitePool,
    collection: String,
}

impl SqliteVectorIndex {
    /// Opens (creating if needed) the index file inside `dir`.
    pub async fn open(dir: &Path, collection: &str) -> Result<Self, RecommenderError> {
        let db_path = dir.join(INDEX_FILE);
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let index = Self {
            pool,
            collection: collection.to_string(),
        };
        index.init_schema().await?;
        Ok(index)
    }

    /// Closes the pool so the backing files can be removed.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<(), RecommenderError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                position INTEGER NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rag_collection ON rag_chunks(collection)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_meta (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (collection, key)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str).ok();

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            metadata,
        }
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn insert_batch(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), RecommenderError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let next_position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM rag_chunks WHERE collection = ?1",
        )
        .bind(&self.collection)
        .fetch_one(&mut *tx)
        .await?;

        for (offset, (chunk, embedding)) in items.iter().enumerate() {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = chunk
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default())
                .unwrap_or_else(|| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO rag_chunks
                    (chunk_id, collection, position, content, source, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&chunk.chunk_id)
            .bind(&self.collection)
            .bind(next_position + offset as i64)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, RecommenderError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, content, source, metadata, embedding
             FROM rag_chunks
             WHERE collection = ?1
             ORDER BY position",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored_emb);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, RecommenderError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }

    async fn embedding_model(&self) -> Result<Option<String>, RecommenderError> {
        let model: Option<String> = sqlx::query_scalar(
            "SELECT value FROM rag_meta WHERE collection = ?1 AND key = 'embedding_model'",
        )
        .bind(&self.collection)
        .fetch_optional(&self.pool)
        .await?;

        Ok(model)
    }

    async fn set_embedding_model(&self, model: &str) -> Result<(), RecommenderError> {
        sqlx::query(
            "INSERT OR REPLACE INTO rag_meta (collection, key, value, updated_at)
             VALUES (?1, 'embedding_model', ?2, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(&self.collection)
        .bind(model)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
