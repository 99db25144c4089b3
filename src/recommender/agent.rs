use std::sync::Arc;

use super::prompt::AGENT_SYSTEM_PROMPT;
use super::stream::{relay_turn, EventSender, StreamEvent};
use crate::core::errors::RecommenderError;
use crate::llm::{ChatMessage, ChatModel, ChatRequest, ToolCall};
use crate::tools::{RetrieveContextTool, TOOL_NAME};

#[derive(Debug)]
enum AgentState {
    AwaitingModel,
    ToolPending(Vec<ToolCall>),
    Done,
}

/// Tool-calling loop: the model decides whether and how often to retrieve.
pub(crate) async fn run_agent(
    chat: &Arc<dyn ChatModel>,
    tool: &RetrieveContextTool,
    question: &str,
    max_steps: usize,
    events: &EventSender,
) -> Result<(), RecommenderError> {
    let tools = vec![RetrieveContextTool::definition()];
    let mut messages = vec![
        ChatMessage::system(AGENT_SYSTEM_PROMPT),
        ChatMessage::user(question),
    ];
    let mut steps = 0usize;
    let mut state = AgentState::AwaitingModel;

    loop {
        state = match state {
            AgentState::AwaitingModel => {
                if steps >= max_steps {
                    return Err(RecommenderError::Internal(format!(
                        "agent did not finish within {} model steps",
                        max_steps
                    )));
                }
                steps += 1;

                let request = ChatRequest::new(messages.clone()).with_tools(tools.clone());
                let turn = relay_turn(chat.stream_chat(request).await?, events).await?;

                if turn.tool_calls.is_empty() {
                    messages.push(ChatMessage::assistant(turn.text));
                    AgentState::Done
                } else {
                    let names: Vec<String> =
                        turn.tool_calls.iter().map(|c| c.name.clone()).collect();
                    tracing::info!("Calling tools: {:?}", names);
                    events.emit(StreamEvent::ToolCalls { names }).await?;
                    messages.push(ChatMessage::assistant_tool_calls(
                        turn.text,
                        turn.tool_calls.clone(),
                    ));
                    AgentState::ToolPending(turn.tool_calls)
                }
            }
            AgentState::ToolPending(calls) => {
                for call in calls {
                    let content = execute_tool_call(tool, &call).await?;
                    events
                        .emit(StreamEvent::ToolResult {
                            name: call.name.clone(),
                            content: content.clone(),
                        })
                        .await?;
                    messages.push(ChatMessage::tool(call.id, content));
                }
                AgentState::AwaitingModel
            }
            AgentState::Done => break,
        };
    }

    tracing::debug!("Agent finished after {} model steps", steps);
    Ok(())
}

/// Runs one requested tool. Mistakes the model can correct come back as an
/// error message for the model; retrieval failures abort the run.
async fn execute_tool_call(
    tool: &RetrieveContextTool,
    call: &ToolCall,
) -> Result<String, RecommenderError> {
    if call.name != TOOL_NAME {
        tracing::warn!("Model requested unknown tool '{}'", call.name);
        return Ok(format!(
            "Error: unknown tool '{}'. Available tools: {}",
            call.name, TOOL_NAME
        ));
    }

    match tool.invoke(&call.arguments).await {
        Ok(message) => Ok(message),
        Err(RecommenderError::Validation(msg)) => {
            tracing::warn!("Rejected tool call {}: {}", call.id, msg);
            Ok(format!("Error: {}", msg))
        }
        Err(err) => Err(err),
    }
}
