use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to initialize model providers: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to warm up recommender: {0}")]
    WarmUp(#[source] anyhow::Error),
}
