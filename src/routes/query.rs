use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::dataset::blob;
use crate::entities::{ChatMessage, ChatStore, SessionStore};
use crate::error::ServerError;
use crate::schemas::chat::{QueryRequest, QueryResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(query_data), components(schemas(QueryRequest, QueryResponse)))]
pub struct QueryApi;

/// Register the query route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/query", post(query_data))
}

/// Answer a natural-language question about a session's dataset.
///
/// The reply is produced by the model agent when possible and by the
/// keyword heuristic otherwise; `source` tells the caller which.  Message
/// logging is best-effort: a transcript write failure is logged but never
/// drops an already-computed reply.
#[utoipa::path(
    post,
    path = "/query",
    tag = "chat",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Reply produced", body = QueryResponse),
        (status = 404, description = "Unknown session"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn query_data(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ServerError> {
    let session = state
        .store
        .get_session(&req.session_id)
        .await?
        .ok_or_else(|| {
            ServerError::NotFound(
                "No data found for this session. Please upload a CSV file first.".into(),
            )
        })?;

    let dataset = blob::decode(&session.csv_data)
        .map_err(|e| ServerError::Internal(format!("failed to decode stored dataset: {e}")))?;

    persist_message(&state, &req.session_id, "user", &req.query, None).await;

    let answer = crate::agent::process_query(
        state.runtime.as_ref(),
        &state.sessions,
        &req.session_id,
        &req.query,
        &dataset,
    )
    .await;

    let source = match answer.source {
        crate::agent::AnswerSource::Agent => "agent",
        crate::agent::AnswerSource::Fallback => "fallback",
    };
    persist_message(
        &state,
        &req.session_id,
        "assistant",
        &answer.text,
        Some(json!({ "source": source }).to_string()),
    )
    .await;

    Ok(Json(QueryResponse {
        session_id: req.session_id,
        query: req.query,
        response: answer.text,
        source: source.into(),
    }))
}

/// Transcript writes never fail the request.
async fn persist_message(
    state: &AppState,
    session_id: &str,
    role: &str,
    content: &str,
    metadata: Option<String>,
) {
    let message = ChatMessage {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.to_owned(),
        role: role.to_owned(),
        content: content.to_owned(),
        metadata,
        created_at: Utc::now(),
    };
    if let Err(e) = state.store.append_message(message).await {
        tracing::warn!(session_id, role, error = %e, "failed to persist chat message");
    }
}
