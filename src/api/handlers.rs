//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, CreateSessionResponse, ErrorResponse, ModelResponse,
    SessionResponse, SuccessResponse,
};
use super::AppState;
use crate::llm::DEFAULT_TEMPERATURE;
use crate::runtime::{RuntimeError, SseEvent};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the chat page
        .route("/", get(serve_spa))
        // Embedded script, styles and logo
        .route("/assets/*path", get(serve_static))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/close", post(close_session))
        // User input
        .route("/api/sessions/:id/chat", post(send_chat))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // Model info
        .route("/api/model", get(get_model))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Page
// ============================================================

async fn serve_spa() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - UI not found</h1>".to_string()),
        )
            .into_response(),
    }
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session = state.runtime.create_session().await;
    Json(CreateSessionResponse {
        session_id: session.id.clone(),
        session,
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.runtime.snapshot(&id).await?;
    Ok(Json(SessionResponse { session }))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.runtime.close_session(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Chat
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let queued = state.runtime.submit(&id, req.text).await?;
    Ok(Json(ChatResponse { queued }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (snapshot, rx) = state.runtime.subscribe(&id).await?;
    Ok(sse_stream(SseEvent::Init { snapshot }, rx))
}

// ============================================================
// Model / Version
// ============================================================

async fn get_model(State(state): State<AppState>) -> Json<ModelResponse> {
    Json(ModelResponse {
        model: state.runtime.model_id().to_string(),
        temperature: DEFAULT_TEMPERATURE,
    })
}

async fn get_version() -> &'static str {
    concat!("brand-assistant ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::NotFound(_) => AppError::NotFound(err.to_string()),
            RuntimeError::Busy => AppError::Conflict(err.to_string()),
            RuntimeError::Closed => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
