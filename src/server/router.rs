use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::Settings;
use crate::server::handlers::{health, recommend, vector};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware
/// - Health check endpoint
/// - Recommendation and vector store endpoints
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings);
    Router::new()
        .route("/health", get(health::health))
        .route("/recommend", post(recommend::recommend))
        .route("/vector/create", post(vector::create_vector_store))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins = settings.cors_origins();
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let allowed_origins = origins
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::{HashEmbedder, ScriptedChatModel};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const RAW: &str = "Name,Genre,Synopsis\n\
        Mecha Force,Mecha,Pilots fight in giant robots\n\
        Cafe Days,Slice of Life,A quiet slice of life in a cafe\n\
        Blade Night,Action,Swordsmen hunt demons at night\n";

    fn test_state(dir: &TempDir, chat: Arc<ScriptedChatModel>) -> Arc<AppState> {
        let raw = dir.path().join("anime_raw.csv");
        std::fs::write(&raw, RAW).unwrap();
        let settings = Settings {
            environment: "test".to_string(),
            model_name: "test-model".to_string(),
            raw_csv_path: raw,
            processed_csv_path: dir.path().join("anime_processed.csv"),
            chroma_dir: dir.path().join("chroma_db"),
            ..Settings::default()
        };
        AppState::with_providers(settings, chat, Arc::new(HashEmbedder::new("hash-embed")))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_environment_and_model() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir, Arc::new(ScriptedChatModel::new(vec![]))));

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "ok", "environment": "test", "model": "test-model" })
        );
    }

    #[tokio::test]
    async fn recommend_before_build_is_a_server_error() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir, Arc::new(ScriptedChatModel::new(vec![]))));

        let (status, body) = send(
            app,
            post_json("/recommend", json!({ "question": "mecha?", "mode": "CHAIN" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("No vector store found"));
    }

    #[tokio::test]
    async fn malformed_body_is_unprocessable() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, Arc::new(ScriptedChatModel::new(vec![])));

        let (status, body) = send(
            router(state.clone()),
            post_json("/recommend", json!({ "mode": "CHAIN" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());

        let (status, _) = send(
            router(state),
            post_json("/recommend", json!({ "question": "x", "mode": "GRAPH" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn build_then_recommend_end_to_end() {
        let dir = TempDir::new().unwrap();
        let chat = Arc::new(ScriptedChatModel::new(vec![
            ScriptedChatModel::text(&["Watch ", "Blade Night"]),
            ScriptedChatModel::tool_call("call_1", "retrieve_context", r#"{"query":"robots"}"#),
            ScriptedChatModel::text(&["Mecha Force"]),
        ]));
        let state = test_state(&dir, chat.clone());

        let (status, body) = send(router(state.clone()), post_empty("/vector/create")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert!(body["seconds"].as_f64().unwrap() >= 0.0);

        let processed = std::fs::read_to_string(&state.settings.processed_csv_path).unwrap();
        assert_eq!(processed.lines().count(), 4);

        let (status, body) = send(
            router(state.clone()),
            post_json("/recommend", json!({ "question": "demons?", "mode": "CHAIN" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "mode": "CHAIN", "answer": "Watch Blade Night" }));
        assert!(chat.requests()[0].messages[0].content.contains("Blade Night"));

        // mode falls back to the configured default (AGENT)
        let (status, body) = send(
            router(state),
            post_json("/recommend", json!({ "question": "robots?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "mode": "AGENT", "answer": "Mecha Force" }));
    }

    #[tokio::test]
    async fn vector_create_failure_returns_detail() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, Arc::new(ScriptedChatModel::new(vec![])));
        std::fs::remove_file(&state.settings.raw_csv_path).unwrap();

        let (status, body) = send(router(state), post_empty("/vector/create")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("was not found"));
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir, Arc::new(ScriptedChatModel::new(vec![]))));

        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:3000"))
        );
    }
}
