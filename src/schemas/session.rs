use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::entities::{ChatMessage, SessionSummary};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionInfoResponse {
    pub session_id: String,
    pub user_id: String,
    pub filename: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub dtypes: Value,
    pub preview: Value,
    pub message_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionSummaryResponse {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub metadata: Value,
    pub message_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub metadata: Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteSessionResponse {
    pub session_id: String,
    pub deleted: bool,
}

/// Stored metadata is JSON text; anything unparseable becomes `null`.
fn metadata_value(raw: Option<&str>) -> Value {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or(Value::Null)
}

impl SessionSummary {
    pub fn to_response(&self) -> SessionSummaryResponse {
        SessionSummaryResponse {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            filename: self.filename.clone(),
            metadata: metadata_value(self.csv_metadata.as_deref()),
            message_count: self.message_count,
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

impl ChatMessage {
    pub fn to_response(&self) -> MessageResponse {
        MessageResponse {
            id: self.id.clone(),
            session_id: self.session_id.clone(),
            role: self.role.clone(),
            content: self.content.clone(),
            metadata: metadata_value(self.metadata.as_deref()),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
