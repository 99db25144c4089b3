use serde::Deserialize;
use serde_json::json;

use crate::core::errors::RecommenderError;
use crate::llm::ToolDefinition;
use crate::rag::{ChunkSearchResult, VectorStore};

pub const TOOL_NAME: &str = "retrieve_context";

const TOOL_DESCRIPTION: &str =
    "Retrieve relevant anime information from the vector store based on the user's query.";

#[derive(Debug, Deserialize)]
struct RetrieveArgs {
    query: String,
}

/// Similarity search over the anime index, exposed as a tool.
#[derive(Clone)]
pub struct RetrieveContextTool {
    store: VectorStore,
    k: usize,
}

impl RetrieveContextTool {
    pub fn new(store: VectorStore, k: usize) -> Self {
        Self { store, k }
    }

    pub fn definition() -> ToolDefinition {
        ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: TOOL_DESCRIPTION.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look up, e.g. a title, genre or theme."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    /// Returns the retrieved chunk texts joined by blank lines, plus the
    /// ranked results they came from.
    pub async fn retrieve(
        &self,
        query: &str,
    ) -> Result<(String, Vec<ChunkSearchResult>), RecommenderError> {
        tracing::info!("[TOOL] {} -> {}", TOOL_NAME, query);
        let results = self.store.similarity_search(query, self.k).await?;
        let summary = results
            .iter()
            .map(|r| r.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok((summary, results))
    }

    /// Runs the tool from the raw JSON arguments of a model tool call and
    /// returns the message fed back to the model.
    pub async fn invoke(&self, arguments: &str) -> Result<String, RecommenderError> {
        let args: RetrieveArgs = serde_json::from_str(arguments).map_err(|e| {
            RecommenderError::Validation(format!("invalid {} arguments: {}", TOOL_NAME, e))
        })?;
        let (summary, _) = self.retrieve(&args.query).await?;
        Ok(tool_message(&summary))
    }
}

pub fn tool_message(summary: &str) -> String {
    format!("Retrieved context:\n{}", summary)
}
