//! OpenAI-compatible chat completions and embeddings over HTTP.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::{ChatModel, DeltaReceiver, EmbeddingProvider};
use super::types::{ChatDelta, ChatMessage, ChatRequest, Role, ToolCall, ToolDefinition};
use crate::core::errors::RecommenderError;

const MAX_RETRIES: usize = 3;

fn build_client(api_key: Option<&str>, timeout: Duration) -> Result<Client, RecommenderError> {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
        let auth = format!("Bearer {}", key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| RecommenderError::Validation("invalid OpenAI API key".to_string()))?,
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| RecommenderError::Internal(format!("failed to build HTTP client: {}", e)))
}

#[derive(Clone)]
pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(
        api_key: Option<&str>,
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RecommenderError> {
        Ok(Self {
            client: build_client(api_key, timeout)?,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<DeltaReceiver, RecommenderError> {
        let messages: Vec<WireMessage<'_>> = request.messages.iter().map(WireMessage::from).collect();
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        if let Some(obj) = body.as_object_mut() {
            if !request.tools.is_empty() {
                let tools: Vec<WireTool<'_>> = request.tools.iter().map(WireTool::from).collect();
                obj.insert("tools".to_string(), json!(tools));
            }
        }

        let res = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(RecommenderError::provider)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RecommenderError::Provider(format!(
                "chat completion failed ({}): {}",
                status, text
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        for delta in decoder.feed(&bytes) {
                            if tx.send(Ok(delta)).await.is_err() {
                                return;
                            }
                        }
                        if decoder.is_done() {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(RecommenderError::provider(e))).await;
                        return;
                    }
                }
            }
            if let Some(delta) = decoder.finish() {
                let _ = tx.send(Ok(delta)).await;
            }
        });

        Ok(rx)
    }
}

#[derive(Clone)]
pub struct OpenAiEmbeddings {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(
        api_key: Option<&str>,
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RecommenderError> {
        Ok(Self {
            client: build_client(api_key, timeout)?,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RecommenderError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut attempt = 0usize;
        loop {
            let response = self.client.post(&self.endpoint).json(&body).send().await;
            match response {
                Ok(resp) if resp.status().is_success() => {
                    let mut parsed: EmbeddingResponse =
                        resp.json().await.map_err(RecommenderError::provider)?;
                    parsed.data.sort_by_key(|entry| entry.index);
                    if parsed.data.len() != inputs.len() {
                        return Err(RecommenderError::Provider(format!(
                            "embedding service returned {} vectors for {} inputs",
                            parsed.data.len(),
                            inputs.len()
                        )));
                    }
                    return Ok(parsed.data.into_iter().map(|e| e.embedding).collect());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if Self::should_retry(status) && attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        tracing::warn!(
                            "Embedding request failed ({}); retry {}/{}",
                            status,
                            attempt,
                            MAX_RETRIES - 1
                        );
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(RecommenderError::Provider(format!(
                        "embedding request failed ({}): {}",
                        status, text
                    )));
                }
                Err(err) => {
                    if (err.is_timeout() || err.is_connect()) && attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(RecommenderError::provider(err));
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        let content = if message.role == Role::Assistant
            && !message.tool_calls.is_empty()
            && message.content.is_empty()
        {
            None
        } else {
            Some(message.content.as_str())
        };
        Self {
            role: message.role.as_str(),
            content,
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: &call.id,
                    kind: "function",
                    function: WireFunction {
                        name: &call.name,
                        arguments: &call.arguments,
                    },
                })
                .collect(),
            tool_call_id: message.tool_call_id.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolFunction<'a>,
}

#[derive(Serialize)]
struct WireToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a ToolDefinition> for WireTool<'a> {
    fn from(tool: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireToolFunction {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.parameters,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Incremental decoder for `text/event-stream` chat completion bodies.
///
/// Text fragments are yielded as they arrive; tool-call fragments are
/// accumulated per index and yielded together once the turn finishes.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    pending: BTreeMap<u32, PartialToolCall>,
    done: bool,
}

impl SseDecoder {
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<ChatDelta> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if line.is_empty() || self.done {
                continue;
            }
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                self.done = true;
                out.extend(self.take_tool_calls());
                continue;
            }

            match serde_json::from_str::<StreamResponse>(data) {
                Ok(response) => {
                    for choice in response.choices {
                        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                            out.push(ChatDelta::Content(content));
                        }
                        for delta in choice.delta.tool_calls.unwrap_or_default() {
                            self.accumulate(delta);
                        }
                        if choice.finish_reason.is_some() {
                            out.extend(self.take_tool_calls());
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!("Ignoring unparseable stream line: {} ({})", data, e);
                }
            }
        }

        out
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    /// Flushes tool calls left over when the body ends without a finish marker.
    pub(crate) fn finish(&mut self) -> Option<ChatDelta> {
        self.take_tool_calls()
    }

    fn accumulate(&mut self, delta: ToolCallDelta) {
        let entry = self.pending.entry(delta.index).or_default();
        // id and name arrive whole (some servers repeat them on every chunk);
        // only arguments are streamed in fragments.
        if let Some(id) = delta.id.filter(|id| !id.is_empty()) {
            if entry.id.is_empty() {
                entry.id = id;
            }
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                if entry.name.is_empty() {
                    entry.name = name;
                }
            }
            if let Some(arguments) = function.arguments {
                entry.arguments.push_str(&arguments);
            }
        }
    }

    fn take_tool_calls(&mut self) -> Option<ChatDelta> {
        if self.pending.is_empty() {
            return None;
        }
        let calls = std::mem::take(&mut self.pending)
            .into_values()
            .map(|partial| ToolCall {
                id: partial.id,
                name: partial.name,
                arguments: partial.arguments,
            })
            .collect();
        Some(ChatDelta::ToolCalls(calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_text_fragments_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let mut deltas = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel");
        assert!(deltas.is_empty());
        deltas.extend(decoder.feed(
            b"lo\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\ndata: [DONE]\n\n",
        ));

        assert_eq!(
            deltas,
            vec![
                ChatDelta::Content("Hello".to_string()),
                ChatDelta::Content(" there".to_string()),
            ]
        );
        assert!(decoder.is_done());
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn assembles_tool_calls_at_finish() {
        let mut decoder = SseDecoder::default();
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"retrieve_context\",\"arguments\":\"\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"query\\\":\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"\\\"mecha\\\"}\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
            "data: [DONE]\n\n",
        );

        let deltas = decoder.feed(body.as_bytes());
        assert_eq!(
            deltas,
            vec![ChatDelta::ToolCalls(vec![ToolCall {
                id: "call_1".to_string(),
                name: "retrieve_context".to_string(),
                arguments: "{\"query\":\"mecha\"}".to_string(),
            }])]
        );
    }

    #[test]
    fn repeated_id_and_name_are_not_duplicated() {
        let mut decoder = SseDecoder::default();
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"retrieve_context\",\"arguments\":\"{\\\"query\\\":\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"retrieve_context\",\"arguments\":\"\\\"robots\\\"}\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
        );

        let deltas = decoder.feed(body.as_bytes());
        assert_eq!(
            deltas,
            vec![ChatDelta::ToolCalls(vec![ToolCall {
                id: "call_1".to_string(),
                name: "retrieve_context".to_string(),
                arguments: "{\"query\":\"robots\"}".to_string(),
            }])]
        );
    }

    #[test]
    fn pending_tool_calls_flush_when_stream_ends_early() {
        let mut decoder = SseDecoder::default();
        let deltas = decoder.feed(
            b"data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"c\",\"function\":{\"name\":\"retrieve_context\",\"arguments\":\"{}\"}}]}}]}\n",
        );
        assert!(deltas.is_empty());
        assert!(matches!(decoder.finish(), Some(ChatDelta::ToolCalls(calls)) if calls.len() == 1));
    }

    #[test]
    fn assistant_tool_turn_serializes_without_content() {
        let message = ChatMessage::assistant_tool_calls(
            "",
            vec![ToolCall {
                id: "call_1".to_string(),
                name: "retrieve_context".to_string(),
                arguments: "{}".to_string(),
            }],
        );
        let wire = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert_eq!(wire["role"], "assistant");
        assert!(wire.get("content").is_none());
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "retrieve_context");

        let tool = ChatMessage::tool("call_1", "Retrieved context:\nx");
        let wire = serde_json::to_value(WireMessage::from(&tool)).unwrap();
        assert_eq!(wire["tool_call_id"], "call_1");
        assert!(wire.get("tool_calls").is_none());
    }
}
