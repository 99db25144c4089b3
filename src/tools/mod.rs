pub mod retrieval;

pub use retrieval::{tool_message, RetrieveContextTool, TOOL_NAME};
