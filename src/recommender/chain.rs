use std::sync::Arc;

use super::prompt::chain_prompt;
use super::stream::{relay_turn, EventSender};
use crate::core::errors::RecommenderError;
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use crate::tools::RetrieveContextTool;

/// Retrieve once with the question, then answer in a single model call.
pub(crate) async fn run_chain(
    chat: &Arc<dyn ChatModel>,
    tool: &RetrieveContextTool,
    question: &str,
    events: &EventSender,
) -> Result<(), RecommenderError> {
    let (context, results) = tool.retrieve(question).await?;
    tracing::debug!("Chain retrieved {} chunks", results.len());

    let request = ChatRequest::new(vec![
        ChatMessage::system(chain_prompt(&context, question)),
        ChatMessage::user(question),
    ]);

    let turn = relay_turn(chat.stream_chat(request).await?, events).await?;
    if !turn.tool_calls.is_empty() {
        tracing::warn!(
            "Model requested {} tool call(s) in chain mode; ignoring",
            turn.tool_calls.len()
        );
    }
    Ok(())
}
