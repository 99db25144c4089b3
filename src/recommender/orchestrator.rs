use std::sync::Arc;

use super::agent::run_agent;
use super::chain::run_chain;
use super::mode::RagMode;
use super::stream::{AnswerFold, EventReceiver, EventSender};
use crate::core::config::Settings;
use crate::core::errors::RecommenderError;
use crate::llm::{ChatModel, EmbeddingProvider};
use crate::rag::{VectorStore, VectorStoreBuilder};
use crate::tools::RetrieveContextTool;

/// A chat model bound to a loaded vector store in a fixed mode.
#[derive(Clone)]
pub struct AnimeRecommender {
    mode: RagMode,
    chat: Arc<dyn ChatModel>,
    tool: RetrieveContextTool,
    max_steps: usize,
}

impl AnimeRecommender {
    /// Loads the persisted index. Fails with `NotFound` if it was never built.
    pub async fn new(
        settings: &Settings,
        mode: RagMode,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RecommenderError> {
        let store = VectorStoreBuilder::new(settings, embedder).load().await?;
        let recommender = Self::with_store(
            mode,
            chat,
            store,
            settings.top_k,
            settings.agent_max_steps,
        );
        tracing::info!("AnimeRecommender initialized in {} mode.", mode);
        Ok(recommender)
    }

    pub fn with_store(
        mode: RagMode,
        chat: Arc<dyn ChatModel>,
        store: VectorStore,
        top_k: usize,
        max_steps: usize,
    ) -> Self {
        Self {
            mode,
            chat,
            tool: RetrieveContextTool::new(store, top_k),
            max_steps,
        }
    }

    pub fn mode(&self) -> RagMode {
        self.mode
    }

    /// Starts a run in the background and returns its events as they happen.
    ///
    /// A failure ends the stream with a single `Err` item.
    pub fn stream(&self, question: &str) -> EventReceiver {
        let (events, rx) = EventSender::channel();
        let this = self.clone();
        let question = question.to_string();

        tokio::spawn(async move {
            let result = match this.mode {
                RagMode::Chain => run_chain(&this.chat, &this.tool, &question, &events).await,
                RagMode::Agent => {
                    run_agent(&this.chat, &this.tool, &question, this.max_steps, &events).await
                }
            };
            if let Err(err) = result {
                tracing::error!("Recommendation failed: {}", err);
                events.fail(err).await;
            }
        });

        rx
    }

    /// Runs the question to completion and returns the final answer.
    pub async fn recommend(&self, question: &str) -> Result<String, RecommenderError> {
        tracing::info!("[QUERY] {}", question);
        tracing::info!("[STREAMING OUTPUT START]");

        let mut rx = self.stream(question);
        let mut fold = AnswerFold::default();
        while let Some(item) = rx.recv().await {
            fold.push(&item?);
        }

        tracing::info!("[STREAMING OUTPUT END]");
        Ok(fold.finish())
    }
}
