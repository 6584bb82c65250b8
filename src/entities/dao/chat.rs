use chrono::{DateTime, Utc};

/// A single message row in the `chat_messages` table.  Immutable once
/// written; removed only via cascading session delete.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    /// Optional JSON text, e.g. `{"source":"fallback"}`.
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}
