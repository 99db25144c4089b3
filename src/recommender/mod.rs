//! Question answering over the anime index.
//!
//! Two variants share one event stream:
//! - `CHAIN`: retrieve once, then a single tool-free model call
//! - `AGENT`: the model calls `retrieve_context` as often as it needs

mod agent;
mod chain;
mod mode;
mod orchestrator;
pub mod prompt;
mod stream;

pub use mode::RagMode;
pub use orchestrator::AnimeRecommender;
pub use stream::{final_answer, AnswerFold, EventReceiver, StreamEvent, NO_RESPONSE};
