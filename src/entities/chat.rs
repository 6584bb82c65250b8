use std::future::Future;

use crate::entities::{dao::ChatMessage, parse_ts, AnyStore};

pub trait ChatStore: Send + Sync + 'static {
    fn append_message(
        &self,
        message: ChatMessage,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Transcript for one session in chronological order.
    fn list_messages(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Vec<ChatMessage>, sqlx::Error>> + Send;

    fn count_messages(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send;
}

impl ChatStore for AnyStore {
    async fn append_message(&self, message: ChatMessage) -> Result<(), sqlx::Error> {
        let created_at = message.created_at.to_rfc3339();
        let sql = self.sql(
            "INSERT INTO chat_messages (id, session_id, role, content, metadata, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        );
        sqlx::query(&sql)
            .bind(&message.id)
            .bind(&message.session_id)
            .bind(&message.role)
            .bind(&message.content)
            .bind(&message.metadata)
            .bind(&created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let sql = self.sql(
            "SELECT id, session_id, role, content, metadata, created_at \
                 FROM chat_messages WHERE session_id = ?1 ORDER BY created_at ASC",
        );
        let rows: Vec<(String, String, String, String, Option<String>, String)> =
            sqlx::query_as(&sql)
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, session_id, role, content, metadata, created_at)| ChatMessage {
                id,
                session_id,
                role,
                content,
                metadata,
                created_at: parse_ts(&created_at),
            })
            .collect())
    }

    async fn count_messages(&self, session_id: &str) -> Result<i64, sqlx::Error> {
        let sql = self.sql("SELECT COUNT(*) FROM chat_messages WHERE session_id = ?1");
        sqlx::query_scalar(&sql)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
    }
}
