use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::agent::processor::{APP_NAME, USER_ID};
use crate::dataset::blob;
use crate::entities::{ChatStore, SessionStore};
use crate::error::ServerError;
use crate::schemas::session::{
    DeleteSessionResponse, MessageResponse, SessionInfoResponse, SessionSummaryResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_session_info, list_session_messages, list_sessions, delete_session),
    components(schemas(
        SessionInfoResponse,
        SessionSummaryResponse,
        MessageResponse,
        DeleteSessionResponse
    ))
)]
pub struct SessionApi;

/// Register session routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/session/{id}", delete(delete_session))
        .route("/session/{id}/info", get(get_session_info))
        .route("/session/{id}/messages", get(list_session_messages))
}

/// Shape, columns, inferred types and message count for one session.
#[utoipa::path(
    get,
    path = "/session/{id}/info",
    tag = "sessions",
    responses(
        (status = 200, description = "Session info retrieved", body = SessionInfoResponse),
        (status = 404, description = "Unknown session"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn get_session_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfoResponse>, ServerError> {
    let session = state
        .store
        .get_session(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Session not found".into()))?;
    let dataset = blob::decode(&session.csv_data)
        .map_err(|e| ServerError::Internal(format!("failed to decode stored dataset: {e}")))?;
    let message_count = state.store.count_messages(&id).await?;

    Ok(Json(SessionInfoResponse {
        session_id: session.id,
        user_id: session.user_id,
        filename: session.filename,
        rows: dataset.rows(),
        columns: dataset.column_names().iter().map(|s| s.to_string()).collect(),
        dtypes: dataset.dtypes(),
        preview: serde_json::Value::Array(dataset.preview(5)),
        message_count,
        created_at: session.created_at.to_rfc3339(),
        updated_at: session.updated_at.to_rfc3339(),
    }))
}

/// Ordered transcript for one session.
#[utoipa::path(
    get,
    path = "/session/{id}/messages",
    tag = "sessions",
    responses(
        (status = 200, description = "Transcript retrieved", body = Vec<MessageResponse>),
        (status = 404, description = "Unknown session"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn list_session_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    if state.store.get_session(&id).await?.is_none() {
        return Err(ServerError::NotFound("Session not found".into()));
    }
    let messages = state.store.list_messages(&id).await?;
    Ok(Json(messages.iter().map(|m| m.to_response()).collect()))
}

/// All sessions, newest first.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "sessions",
    responses(
        (status = 200, description = "Session list retrieved", body = Vec<SessionSummaryResponse>),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SessionSummaryResponse>>, ServerError> {
    let sessions = state.store.list_sessions().await?;
    Ok(Json(sessions.iter().map(|s| s.to_response()).collect()))
}

/// Delete a session and its whole transcript.
#[utoipa::path(
    delete,
    path = "/session/{id}",
    tag = "sessions",
    responses(
        (status = 200, description = "Session deleted", body = DeleteSessionResponse),
        (status = 404, description = "Unknown session"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSessionResponse>, ServerError> {
    if !state.store.delete_session(&id).await? {
        return Err(ServerError::NotFound("Session not found".into()));
    }
    // Drop the in-memory conversation handle too so a recreated session
    // starts with a clean history.
    state.sessions.remove(APP_NAME, USER_ID, &id);
    Ok(Json(DeleteSessionResponse { session_id: id, deleted: true }))
}
