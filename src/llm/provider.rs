use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{ChatDelta, ChatRequest};
use crate::core::errors::RecommenderError;

pub type DeltaReceiver = mpsc::Receiver<Result<ChatDelta, RecommenderError>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// model identifier (e.g. "gpt-4o-mini")
    fn name(&self) -> &str;

    /// streaming chat completion; the receiver closes when the turn ends
    async fn stream_chat(&self, request: ChatRequest) -> Result<DeltaReceiver, RecommenderError>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// embedding model identifier, persisted alongside the index
    fn model(&self) -> &str;

    /// one vector per input, in input order
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RecommenderError>;
}
