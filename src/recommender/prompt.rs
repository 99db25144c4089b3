pub const AGENT_SYSTEM_PROMPT: &str = "You are an expert anime recommender agent.

Your goal is to recommend the best anime titles for each user query.
If you need more information, use the 'retrieve_context' tool to gather
relevant anime details.

Steps to follow:
1. Understand user intent and preferences.
2. Retrieve additional info if needed (via 'retrieve_context').
3. Recommend 3 anime titles with:
   - A short summary (2-3 lines)
   - Why it matches user preferences
4. Be factual, concise, and avoid fabricating data.";

/// Builds the chain-mode system prompt around the retrieved context.
pub fn chain_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an expert anime recommender. Your job is to help users find \
the perfect anime based on their preferences.

Using only the context below, recommend 3 anime titles that best match the user's request. \
For each title give a short summary (2-3 lines) and explain why it matches the user's preferences.

If the context does not contain a good match, say so honestly instead of inventing titles.

Context:
{context}

User's question:
{question}

Your recommendations:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_prompt_embeds_context_and_question() {
        let prompt = chain_prompt("Title: Mecha Force", "Something with robots?");
        assert!(prompt.contains("Context:\nTitle: Mecha Force\n"));
        assert!(prompt.contains("User's question:\nSomething with robots?\n"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn agent_prompt_names_the_tool() {
        assert!(AGENT_SYSTEM_PROMPT.contains("'retrieve_context'"));
    }
}
