//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AdvisorsResponse, ContextListResponse, CreateSessionRequest, ErrorResponse, LocaleQuery,
    OpenContextRequest, SessionResponse, SetLocaleRequest, SubmitRequest, SubmitResponse,
    SuccessResponse,
};
use super::AppState;
use crate::runtime::SessionHandle;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Context selector
        .route("/api/contexts", get(list_contexts))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // Session actions
        .route("/api/sessions/:id/open", post(open_context))
        .route("/api/sessions/:id/locale", post(set_locale))
        .route("/api/sessions/:id/submit", post(submit))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // Dashboard
        .route("/api/advisors", get(list_advisors))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Contexts
// ============================================================

async fn list_contexts(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> Json<ContextListResponse> {
    let locale = query.locale.unwrap_or_default();
    Json(ContextListResponse {
        contexts: state.sessions.contexts().list(locale),
    })
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = state
        .sessions
        .create(&req.context, req.locale)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(SessionResponse::from_handle(&handle)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = find_session(&state, &id).await?;
    Ok(Json(SessionResponse::from_handle(&handle)))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.sessions.remove(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(AppError::NotFound(format!("Session not found: {id}")))
    }
}

// ============================================================
// Session Actions
// ============================================================

async fn open_context(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<OpenContextRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = find_session(&state, &id).await?;
    handle
        .open(req.context, req.locale)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(SessionResponse::from_handle(&handle)))
}

async fn set_locale(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetLocaleRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let handle = find_session(&state, &id).await?;
    handle
        .set_locale(req.locale)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn submit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let handle = find_session(&state, &id).await?;
    let outcome = handle
        .submit(req.text)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(SubmitResponse { outcome }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = find_session(&state, &id).await?;
    let sync = handle
        .sync()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(sse_stream(handle, sync))
}

async fn find_session(state: &AppState, id: &str) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Dashboard
// ============================================================

async fn list_advisors(State(state): State<AppState>) -> Json<AdvisorsResponse> {
    Json(AdvisorsResponse {
        advisors: state.advisors.entries(),
        loaded: state.advisors.is_loaded(),
    })
}

async fn get_version() -> &'static str {
    concat!("nexus ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
