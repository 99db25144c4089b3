//! In-process providers for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::provider::{ChatModel, DeltaReceiver, EmbeddingProvider};
use super::types::{ChatDelta, ChatRequest, ToolCall};
use crate::core::errors::RecommenderError;

const DIMENSIONS: usize = 64;

/// Bag-of-words embedder: each lowercase token bumps one hashed dimension.
pub struct HashEmbedder {
    model: String,
    calls: AtomicUsize,
    inputs: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            calls: AtomicUsize::new(0),
            inputs: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embedded_inputs(&self) -> usize {
        self.inputs.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIMENSIONS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let hash = token
                .bytes()
                .fold(2166136261u32, |acc, b| (acc ^ b as u32).wrapping_mul(16777619));
            vector[hash as usize % DIMENSIONS] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RecommenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.fetch_add(inputs.len(), Ordering::SeqCst);
        Ok(inputs.iter().map(|text| Self::vector(text)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model(&self) -> &str {
        "failing-embedder"
    }

    async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, RecommenderError> {
        Err(RecommenderError::Provider("embedding service unavailable".to_string()))
    }
}

/// Chat model that replays pre-recorded turns and records every request.
pub struct ScriptedChatModel {
    turns: Mutex<VecDeque<Vec<ChatDelta>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatModel {
    pub fn new(turns: Vec<Vec<ChatDelta>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn text(parts: &[&str]) -> Vec<ChatDelta> {
        parts
            .iter()
            .map(|p| ChatDelta::Content(p.to_string()))
            .collect()
    }

    pub fn tool_call(id: &str, name: &str, arguments: &str) -> Vec<ChatDelta> {
        vec![ChatDelta::ToolCalls(vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }])]
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    fn name(&self) -> &str {
        "scripted-model"
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<DeltaReceiver, RecommenderError> {
        self.requests.lock().unwrap().push(request);
        let turn = self.turns.lock().unwrap().pop_front().unwrap_or_default();

        let (tx, rx) = mpsc::channel(turn.len().max(1));
        for delta in turn {
            let _ = tx.send(Ok(delta)).await;
        }
        Ok(rx)
    }
}

pub struct FailingChatModel;

#[async_trait]
impl ChatModel for FailingChatModel {
    fn name(&self) -> &str {
        "failing-model"
    }

    async fn stream_chat(&self, _request: ChatRequest) -> Result<DeltaReceiver, RecommenderError> {
        Err(RecommenderError::Provider("model unavailable".to_string()))
    }
}
