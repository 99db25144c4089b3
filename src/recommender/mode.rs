use std::fmt;

use serde::{Deserialize, Serialize};

/// How the recommender obtains context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RagMode {
    /// The model decides when to call `retrieve_context`.
    Agent,
    /// Retrieval always runs once before a single model call.
    Chain,
}

impl RagMode {
    /// Case-insensitive; anything other than `AGENT` selects the chain.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("AGENT") {
            RagMode::Agent
        } else {
            RagMode::Chain
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RagMode::Agent => "AGENT",
            RagMode::Chain => "CHAIN",
        }
    }
}

impl fmt::Display for RagMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
