use std::sync::Arc;

use crate::core::config::Settings;
use crate::core::errors::RecommenderError;
use crate::llm::{ChatModel, EmbeddingProvider, OpenAiChatModel, OpenAiEmbeddings};
use crate::services::{BuildReport, RecommenderService, VectorService};

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Contains:
/// - Resolved settings
/// - The recommender cache
/// - The vector rebuild service
pub struct AppState {
    pub settings: Arc<Settings>,
    pub recommender: RecommenderService,
    pub vectors: VectorService,
}

impl AppState {
    /// Builds the OpenAI-compatible providers from `settings` and wires the
    /// services around them. Nothing is loaded from disk yet.
    pub fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        let timeout = settings.request_timeout();
        let api_key = settings.openai_api_key.as_deref();
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY is not set; requests to the provider will be unauthenticated");
        }

        let chat = OpenAiChatModel::new(
            api_key,
            &settings.openai_base_url,
            settings.model_name.clone(),
            timeout,
        )
        .map_err(|e| InitializationError::Llm(e.into()))?;
        let embedder = OpenAiEmbeddings::new(
            api_key,
            &settings.openai_base_url,
            settings.embedding_model.clone(),
            timeout,
        )
        .map_err(|e| InitializationError::Llm(e.into()))?;

        Ok(Self::with_providers(
            settings,
            Arc::new(chat),
            Arc::new(embedder),
        ))
    }

    pub fn with_providers(
        settings: Settings,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Arc<Self> {
        let settings = Arc::new(settings);
        Arc::new(AppState {
            recommender: RecommenderService::new(settings.clone(), chat, embedder.clone()),
            vectors: VectorService::new(settings.clone(), embedder),
            settings,
        })
    }

    /// Preloads the recommender for the configured mode.
    ///
    /// A missing index only logs a warning so the service can start and be
    /// built through `/vector/create`; any other failure is fatal.
    pub async fn warm_up(&self) -> Result<(), InitializationError> {
        let mode = self.settings.rag_mode.to_uppercase();
        match self.recommender.get_recommender(&mode).await {
            Ok(_) => {
                tracing::info!("Startup warm-up complete in mode: {}", mode);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "No vector store found at '{}'. Skipping warm-up. Please build vector store via /vector/create.",
                    self.settings.chroma_dir.display()
                );
                Ok(())
            }
            Err(e) => Err(InitializationError::WarmUp(e.into())),
        }
    }

    /// Rebuilds the index and drops the cached recommender that was bound to
    /// the previous one.
    pub async fn rebuild_index(&self) -> Result<BuildReport, RecommenderError> {
        let report = self.vectors.build_vector_store().await?;
        self.recommender.invalidate().await;
        Ok(report)
    }
}
