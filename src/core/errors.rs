use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures raised below the HTTP layer.
///
/// Components return the most specific variant they can; the HTTP layer
/// collapses all of them into a 500 (see [`ApiError`]).
#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    EmptyInput(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("{0}")]
    Internal(String),
}

impl RecommenderError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RecommenderError::Internal(err.to_string())
    }

    pub fn provider<E: std::fmt::Display>(err: E) -> Self {
        RecommenderError::Provider(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RecommenderError::NotFound(_))
    }
}

impl From<std::io::Error> for RecommenderError {
    fn from(err: std::io::Error) -> Self {
        RecommenderError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for RecommenderError {
    fn from(err: sqlx::Error) -> Self {
        RecommenderError::Internal(format!("vector store error: {}", err))
    }
}

impl From<csv::Error> for RecommenderError {
    fn from(err: csv::Error) -> Self {
        RecommenderError::Internal(format!("csv error: {}", err))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unprocessable request: {0}")]
    Unprocessable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RecommenderError> for ApiError {
    fn from(err: RecommenderError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({ "detail": message }));
        (status, body).into_response()
    }
}
