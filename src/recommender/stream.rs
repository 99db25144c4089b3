//! Recommendation event stream and its reduction to a final answer.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::errors::RecommenderError;
use crate::llm::{ChatDelta, DeltaReceiver, ToolCall};

/// Returned when the model never produced any assistant text.
pub const NO_RESPONSE: &str = "[No response generated]";

const EVENT_BUFFER: usize = 64;

pub type EventReceiver = mpsc::Receiver<Result<StreamEvent, RecommenderError>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Assistant text of the current model turn so far (cumulative).
    AssistantText { content: String },
    /// The model requested these tools; any text of that turn is a preamble.
    ToolCalls { names: Vec<String> },
    ToolResult { name: String, content: String },
}

/// Folds events into the answer returned to callers.
///
/// The answer is the last non-empty assistant text that was not followed by a
/// tool request. Tool calls and tool results never become part of it.
#[derive(Debug, Default)]
pub struct AnswerFold {
    answer: Option<String>,
}

impl AnswerFold {
    pub fn push(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::AssistantText { content } if !content.is_empty() => {
                self.answer = Some(content.clone());
            }
            StreamEvent::ToolCalls { .. } => self.answer = None,
            _ => {}
        }
    }

    pub fn finish(self) -> String {
        self.answer.unwrap_or_else(|| NO_RESPONSE.to_string())
    }
}

pub fn final_answer<'a>(events: impl IntoIterator<Item = &'a StreamEvent>) -> String {
    let mut fold = AnswerFold::default();
    for event in events {
        fold.push(event);
    }
    fold.finish()
}

/// Producer half of an event stream.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: mpsc::Sender<Result<StreamEvent, RecommenderError>>,
}

impl EventSender {
    pub(crate) fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (Self { tx }, rx)
    }

    pub(crate) async fn emit(&self, event: StreamEvent) -> Result<(), RecommenderError> {
        self.tx
            .send(Ok(event))
            .await
            .map_err(|_| RecommenderError::Internal("recommendation stream was closed".to_string()))
    }

    pub(crate) async fn fail(&self, err: RecommenderError) {
        let _ = self.tx.send(Err(err)).await;
    }
}

/// Everything one model turn produced.
#[derive(Debug, Default)]
pub(crate) struct Turn {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Drains one streamed model turn, forwarding assistant text as it arrives.
pub(crate) async fn relay_turn(
    mut deltas: DeltaReceiver,
    events: &EventSender,
) -> Result<Turn, RecommenderError> {
    let mut turn = Turn::default();
    while let Some(delta) = deltas.recv().await {
        match delta? {
            ChatDelta::Content(fragment) => {
                if fragment.is_empty() {
                    continue;
                }
                turn.text.push_str(&fragment);
                events
                    .emit(StreamEvent::AssistantText {
                        content: turn.text.clone(),
                    })
                    .await?;
            }
            ChatDelta::ToolCalls(calls) => turn.tool_calls.extend(calls),
        }
    }
    Ok(turn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> StreamEvent {
        StreamEvent::AssistantText {
            content: content.to_string(),
        }
    }

    #[test]
    fn last_assistant_text_wins() {
        let events = vec![text("Try"), text("Try Mecha Force"), text("Try Mecha Force!")];
        assert_eq!(final_answer(&events), "Try Mecha Force!");
    }

    #[test]
    fn tool_events_are_discarded() {
        let events = vec![
            text("Let me look that up"),
            StreamEvent::ToolCalls {
                names: vec!["retrieve_context".to_string()],
            },
            StreamEvent::ToolResult {
                name: "retrieve_context".to_string(),
                content: "Retrieved context:\nTitle: X".to_string(),
            },
            text("Watch X"),
        ];
        assert_eq!(final_answer(&events), "Watch X");
    }

    #[test]
    fn no_text_yields_sentinel() {
        assert_eq!(final_answer(&Vec::<StreamEvent>::new()), NO_RESPONSE);

        let only_tools = vec![
            text("preamble"),
            StreamEvent::ToolCalls {
                names: vec!["retrieve_context".to_string()],
            },
        ];
        assert_eq!(final_answer(&only_tools), NO_RESPONSE);
        assert_eq!(final_answer(&[text("")]), NO_RESPONSE);
    }

    #[tokio::test]
    async fn relay_turn_accumulates_text_and_collects_tool_calls() {
        let (delta_tx, delta_rx) = mpsc::channel(8);
        delta_tx.send(Ok(ChatDelta::Content("Hel".into()))).await.unwrap();
        delta_tx.send(Ok(ChatDelta::Content("lo".into()))).await.unwrap();
        delta_tx
            .send(Ok(ChatDelta::ToolCalls(vec![ToolCall {
                id: "call_1".into(),
                name: "retrieve_context".into(),
                arguments: "{}".into(),
            }])))
            .await
            .unwrap();
        drop(delta_tx);

        let (events, mut rx) = EventSender::channel();
        let turn = relay_turn(delta_rx, &events).await.unwrap();
        drop(events);

        assert_eq!(turn.text, "Hello");
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(rx.recv().await.unwrap().unwrap(), text("Hel"));
        assert_eq!(rx.recv().await.unwrap().unwrap(), text("Hello"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn relay_turn_propagates_provider_errors() {
        let (delta_tx, delta_rx) = mpsc::channel(2);
        delta_tx
            .send(Err(RecommenderError::Provider("boom".into())))
            .await
            .unwrap();
        drop(delta_tx);

        let (events, _rx) = EventSender::channel();
        let err = relay_turn(delta_rx, &events).await.err().unwrap();
        assert!(matches!(err, RecommenderError::Provider(_)));
    }
}
