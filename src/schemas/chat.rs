use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub session_id: String,
    pub message: String,
    pub rows: usize,
    pub columns: Vec<String>,
    /// First rows of the dataset as JSON records.
    pub preview: Value,
    /// Backend the session was persisted to, `sqlite` or `postgresql`.
    pub storage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryRequest {
    pub session_id: String,
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    pub session_id: String,
    pub query: String,
    pub response: String,
    /// Which pipeline stage produced the reply, `agent` or `fallback`.
    pub source: String,
}
