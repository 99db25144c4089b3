//! Anime recommendation service: CSV ingestion, a persisted vector index,
//! and chain or agent style answering over an OpenAI-compatible API.

pub mod core;
pub mod dataio;
pub mod llm;
pub mod rag;
pub mod recommender;
pub mod server;
pub mod services;
pub mod state;
pub mod tools;
