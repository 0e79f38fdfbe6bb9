//! HTTP API over the query service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat` | Answer a legal question with web citations |
//! | `POST` | `/quiz` | Generate multiple-choice quiz items |
//! | `GET`  | `/health` | Status, version, index size and configured backends |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid request: query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `retrieval_unavailable` (503),
//! `generation_unavailable` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front-ends can
//! call the API directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Capabilities, Config};
use crate::error::ServiceError;
use crate::service::{ChatRequest, ChatResponse, QuizRequest, QuizResponse, RagService};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<RagService>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// The persisted index is loaded once here and served read-only until the
/// process exits. Re-ingesting requires a restart to take effect.
pub async fn run_server(config: &Config, caps: &Capabilities) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let service = Arc::new(RagService::from_config(config.clone(), caps)?);

    tracing::info!(
        generative = service.is_generative(),
        web_search = service.has_web_search(),
        chunks = service.index().len(),
        "query service ready"
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("ius server listening on http://{}", bind_addr);
    axum::serve(listener, router(service)).await?;

    Ok(())
}

/// The application router, exposed for in-process tests.
pub fn router(service: Arc<RagService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/quiz", post(handle_quiz))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { service })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::RetrievalUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::GenerationUnavailable(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            tracing::warn!(code = err.code(), error = %err, "request failed");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    /// Number of indexed chunks.
    chunks: usize,
    generative: bool,
    web_search: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chunks: state.service.index().len(),
        generative: state.service.is_generative(),
        web_search: state.service.has_web_search(),
    })
}

// ============ POST /chat ============

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    Ok(Json(state.service.chat(req).await?))
}

// ============ POST /quiz ============

async fn handle_quiz(
    State(state): State<AppState>,
    Json(req): Json<QuizRequest>,
) -> Result<Json<QuizResponse>, AppError> {
    Ok(Json(state.service.quiz(req).await?))
}
