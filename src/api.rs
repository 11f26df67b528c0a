//! REST API Server for the answering loop
//!
//! Exposes `RagLoop::run` over HTTP

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::RagLoop;
use crate::error::RagError;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AskRequest {
    pub question: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub rag: Arc<RagLoop>,
}

fn status_for(error: &RagError) -> StatusCode {
    match error {
        RagError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        e if e.is_collaborator_failure() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Ask Endpoint
/// =============================

async fn ask(
    State(state): State<ApiState>,
    Json(req): Json<AskRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let question = req.question.trim();

    if question.is_empty() {
        let error = RagError::InvalidRequest("question must not be empty".to_string());
        return (status_for(&error), Json(ApiResponse::error(error.to_string())));
    }

    info!("Received question: {}", question);

    match state.rag.run(question).await {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))),
        Err(e) => {
            warn!("Run failed: {}", e);
            (status_for(&e), Json(ApiResponse::error(format!("Run failed: {}", e))))
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(rag: Arc<RagLoop>) -> Router {
    let state = ApiState { rag };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/ask", post(ask))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    rag: Arc<RagLoop>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(rag);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::LoopConfig;
    use crate::knowledge::StaticKnowledgeBase;
    use crate::llm::ScriptedModel;
    use crate::models::Snippet;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn router(model: ScriptedModel) -> Router {
        let kb = StaticKnowledgeBase::new()
            .with_fallback(vec![Snippet::new("KB1", "Cache reads with a TTL")]);
        let rag = RagLoop::new(Arc::new(kb), Arc::new(model), LoopConfig::default());
        create_router(Arc::new(rag))
    }

    fn ask_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/ask")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(ScriptedModel::new(Vec::<String>::new()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ask_returns_outcome() {
        let response = router(ScriptedModel::new(["Use a TTL [KB1]", "COMPLETE"]))
            .oneshot(ask_request(r#"{"question": "What are best practices for caching?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["final_answer"], "Use a TTL [KB1]");
        assert_eq!(body["data"]["verdict"]["verdict"], "complete");
        assert_eq!(body["data"]["snippets_used"][0]["id"], "KB1");
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let response = router(ScriptedModel::new(["unused"]))
            .oneshot(ask_request(r#"{"question": "   "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_model_failure_is_bad_gateway() {
        let model = ScriptedModel::new(Vec::<String>::new()).then_fail("upstream down");
        let response = router(model)
            .oneshot(ask_request(r#"{"question": "How do I version my APIs?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("upstream down"));
    }
}
