use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::recommender::RagMode;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub question: String,
    #[serde(default)]
    pub mode: Option<RagMode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub mode: String,
    pub answer: String,
}

pub async fn recommend(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))?;

    let mode = match req.mode {
        Some(mode) => mode.as_str().to_string(),
        None => state.settings.rag_mode.to_uppercase(),
    };

    let answer = async {
        let recommender = state.recommender.get_recommender(&mode).await?;
        recommender.recommend(&req.question).await
    }
    .await
    .map_err(|e| {
        tracing::error!("Recommendation failed: {}", e);
        ApiError::from(e)
    })?;

    Ok(Json(RecommendResponse { mode, answer }))
}
