use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::config::Settings;
use crate::core::errors::RecommenderError;
use crate::dataio::AnimeDataLoader;
use crate::llm::EmbeddingProvider;
use crate::rag::VectorStoreBuilder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub status: String,
    pub seconds: f64,
}

/// Rebuilds the persisted index from the raw dataset.
pub struct VectorService {
    settings: Arc<Settings>,
    embedder: Arc<dyn EmbeddingProvider>,
    build_lock: Mutex<()>,
}

impl VectorService {
    pub fn new(settings: Arc<Settings>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            settings,
            embedder,
            build_lock: Mutex::new(()),
        }
    }

    /// Clears the persistence directory, reprocesses the raw CSV and embeds
    /// it again. Concurrent calls run one after another.
    pub async fn build_vector_store(&self) -> Result<BuildReport, RecommenderError> {
        let _guard = self.build_lock.lock().await;
        let started = Instant::now();
        tracing::info!("Starting vector store build...");

        let result = self.rebuild().await;
        if let Err(err) = &result {
            tracing::error!("Vector store build failed: {}", err);
        }
        result?;

        let seconds = round_secs(started.elapsed().as_secs_f64());
        tracing::info!("Vector store successfully built in {}s.", seconds);
        Ok(BuildReport {
            status: "success".to_string(),
            seconds,
        })
    }

    async fn rebuild(&self) -> Result<(), RecommenderError> {
        clear_directory(&self.settings.chroma_dir).await?;

        let loader = AnimeDataLoader::new(
            self.settings.raw_csv_path.clone(),
            self.settings.processed_csv_path.clone(),
        );
        let processed = tokio::task::spawn_blocking(move || loader.load_and_process())
            .await
            .map_err(RecommenderError::internal)??;
        tracing::info!("Processed data saved to: {}", processed.display());

        let store = VectorStoreBuilder::new(&self.settings, self.embedder.clone())
            .create(&processed)
            .await?;
        tracing::debug!(
            "Collection '{}' now holds {} chunks",
            store.collection(),
            store.count().await?
        );
        Ok(())
    }
}

/// Removes `dir` and everything under it. A missing directory is fine.
async fn clear_directory(dir: &Path) -> Result<(), RecommenderError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            tracing::info!("Cleared existing vector store at: {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No existing vector store found at {}.", dir.display());
            Ok(())
        }
        Err(e) => Err(RecommenderError::Internal(format!(
            "failed to clear vector store at {}: {}",
            dir.display(),
            e
        ))),
    }
}

fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
