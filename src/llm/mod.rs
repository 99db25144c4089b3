pub mod openai;
pub mod provider;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use openai::{OpenAiChatModel, OpenAiEmbeddings};
pub use provider::{ChatModel, DeltaReceiver, EmbeddingProvider};
pub use types::{ChatDelta, ChatMessage, ChatRequest, Role, ToolCall, ToolDefinition};
