use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::core::errors::ApiError;
use crate::services::BuildReport;
use crate::state::AppState;

pub async fn create_vector_store(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BuildReport>, ApiError> {
    let report = state.rebuild_index().await?;
    tracing::info!("Vector store created successfully.");
    Ok(Json(report))
}
