use super::settings::Settings;
use crate::core::errors::RecommenderError;

pub fn validate_settings(settings: &Settings) -> Result<(), RecommenderError> {
    validate_range("top_k", settings.top_k as u64, 1, 100)?;
    validate_range(
        "embedding_batch_size",
        settings.embedding_batch_size as u64,
        1,
        2048,
    )?;
    validate_range("agent_max_steps", settings.agent_max_steps as u64, 1, 1_000)?;
    validate_range(
        "request_timeout_secs",
        settings.request_timeout_secs,
        1,
        86_400,
    )?;
    validate_non_empty("model_name", &settings.model_name)?;
    validate_non_empty("embedding_model", &settings.embedding_model)?;
    validate_non_empty("chroma_collection", &settings.chroma_collection)?;
    validate_non_empty("openai_base_url", &settings.openai_base_url)?;
    Ok(())
}

fn validate_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), RecommenderError> {
    if value < min || value > max {
        return Err(RecommenderError::Validation(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty(path: &str, value: &str) -> Result<(), RecommenderError> {
    if value.trim().is_empty() {
        return Err(RecommenderError::Validation(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}
