use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::config::Settings;
use crate::core::errors::RecommenderError;
use crate::llm::{ChatModel, EmbeddingProvider};
use crate::recommender::{AnimeRecommender, RagMode};

/// Holds at most one recommender, keyed by its mode.
///
/// A request for a different mode replaces the cached instance. The lock is
/// held while a new recommender is being built.
pub struct RecommenderService {
    settings: Arc<Settings>,
    chat: Arc<dyn ChatModel>,
    embedder: Arc<dyn EmbeddingProvider>,
    cached: Mutex<Option<(RagMode, Arc<AnimeRecommender>)>>,
}

impl RecommenderService {
    pub fn new(
        settings: Arc<Settings>,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            settings,
            chat,
            embedder,
            cached: Mutex::new(None),
        }
    }

    pub async fn get_recommender(
        &self,
        mode: &str,
    ) -> Result<Arc<AnimeRecommender>, RecommenderError> {
        let mode = RagMode::parse(mode);
        let mut cached = self.cached.lock().await;

        if let Some((cached_mode, rec)) = cached.as_ref() {
            if *cached_mode == mode {
                return Ok(rec.clone());
            }
        }

        let rec = Arc::new(
            AnimeRecommender::new(&self.settings, mode, self.chat.clone(), self.embedder.clone())
                .await?,
        );
        *cached = Some((mode, rec.clone()));
        tracing::info!("Initialized new recommender in mode: {}", mode);
        Ok(rec)
    }

    /// Drops the cached recommender so the next request reloads the index.
    pub async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            tracing::info!("Recommender cache invalidated");
        }
    }

    pub async fn cached_mode(&self) -> Option<RagMode> {
        self.cached.lock().await.as_ref().map(|(mode, _)| *mode)
    }
}
