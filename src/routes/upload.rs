use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::dataset::{blob, Dataset};
use crate::entities::{ChatSession, SessionStore};
use crate::error::ServerError;
use crate::schemas::chat::UploadResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(upload_file), components(schemas(UploadResponse)))]
pub struct UploadApi;

/// Register the upload route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/upload", post(upload_file))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub session_id: Option<String>,
}

/// Upload a CSV file and persist it as a chat session.
///
/// The session id may come from the query string or a `session_id` form
/// part; re-uploading to an existing id replaces that session's dataset.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "chat",
    request_body(content = String, content_type = "multipart/form-data"),
    params(("session_id" = Option<String>, Query, description = "Reuse an existing session id")),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing, non-CSV, empty or malformed file"),
        (status = 500, description = "Backend error"),
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let mut session_id = params.session_id;
    let mut filename: Option<String> = None;
    let mut contents: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                filename = field.file_name().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Invalid multipart body: {e}")))?;
                contents = Some(bytes.to_vec());
            }
            Some("session_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Invalid multipart body: {e}")))?;
                if !text.is_empty() {
                    session_id = Some(text);
                }
            }
            _ => {}
        }
    }

    let filename = match filename {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ServerError::BadRequest("No file provided".into())),
    };
    if !filename.ends_with(".csv") {
        return Err(ServerError::BadRequest("File must be a CSV".into()));
    }
    let contents = contents.unwrap_or_default();
    if contents.is_empty() {
        return Err(ServerError::BadRequest("File is empty".into()));
    }

    let dataset =
        Dataset::from_csv_bytes(&contents).map_err(|e| ServerError::BadRequest(e.to_string()))?;

    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let columns: Vec<String> = dataset.column_names().iter().map(|s| s.to_string()).collect();
    let metadata = json!({
        "rows": dataset.rows(),
        "columns": columns,
        "dtypes": dataset.dtypes(),
    });

    let csv_data = blob::encode(&dataset)
        .map_err(|e| ServerError::Internal(format!("failed to encode dataset: {e}")))?;

    let now = Utc::now();
    state
        .store
        .upsert_session(ChatSession {
            id: session_id.clone(),
            user_id: crate::agent::processor::USER_ID.to_owned(),
            filename,
            csv_data,
            csv_metadata: Some(metadata.to_string()),
            created_at: now,
            updated_at: now,
        })
        .await?;

    Ok(Json(UploadResponse {
        session_id,
        message: "File uploaded successfully".into(),
        rows: dataset.rows(),
        columns,
        preview: serde_json::Value::Array(dataset.preview(5)),
        storage: state.config.storage_label().into(),
    }))
}
