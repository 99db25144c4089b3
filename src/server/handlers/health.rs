use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Health check requested.");
    Json(json!({
        "status": "ok",
        "environment": state.settings.environment,
        "model": state.settings.model_name,
    }))
}
