use chrono::{DateTime, Utc};

/// A row in the `chat_sessions` table: one uploaded dataset plus metadata.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    /// Gzip-compressed serialized dataset (see [`crate::dataset::blob`]).
    pub csv_data: Vec<u8>,
    /// JSON text: `{rows, columns, dtypes}`.  Replaced together with
    /// `csv_data` on re-upload so the two never drift apart.
    pub csv_metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row: everything except the dataset blob, plus the message count.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub csv_metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: i64,
}
