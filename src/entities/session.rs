use std::future::Future;

use crate::entities::{dao::ChatSession, dao::SessionSummary, parse_ts, AnyStore};

pub trait SessionStore: Send + Sync + 'static {
    /// Insert the session, or replace blob + metadata + filename if the id
    /// already exists.
    fn upsert_session(
        &self,
        session: ChatSession,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn get_session(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<ChatSession>, sqlx::Error>> + Send;

    /// All sessions, newest first, without blobs.
    fn list_sessions(
        &self,
    ) -> impl Future<Output = Result<Vec<SessionSummary>, sqlx::Error>> + Send;

    /// Delete the session and all its messages.  Returns `false` when the
    /// id does not exist.
    fn delete_session(&self, id: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

impl SessionStore for AnyStore {
    async fn upsert_session(&self, session: ChatSession) -> Result<(), sqlx::Error> {
        let created_at = session.created_at.to_rfc3339();
        let updated_at = session.updated_at.to_rfc3339();
        let sql = self.sql(
            "INSERT INTO chat_sessions \
                 (id, user_id, filename, csv_data, csv_metadata, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(id) DO UPDATE SET \
                 user_id = excluded.user_id, \
                 filename = excluded.filename, \
                 csv_data = excluded.csv_data, \
                 csv_metadata = excluded.csv_metadata, \
                 updated_at = excluded.updated_at",
        );
        sqlx::query(&sql)
            .bind(&session.id)
            .bind(&session.user_id)
            .bind(&session.filename)
            .bind(&session.csv_data)
            .bind(&session.csv_metadata)
            .bind(&created_at)
            .bind(&updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, sqlx::Error> {
        let sql = self.sql(
            "SELECT id, user_id, filename, csv_data, csv_metadata, created_at, updated_at \
                 FROM chat_sessions WHERE id = ?1",
        );
        let row: Option<(String, String, String, Vec<u8>, Option<String>, String, String)> =
            sqlx::query_as(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(
            |(id, user_id, filename, csv_data, csv_metadata, created_at, updated_at)| ChatSession {
                id,
                user_id,
                filename,
                csv_data,
                csv_metadata,
                created_at: parse_ts(&created_at),
                updated_at: parse_ts(&updated_at),
            },
        ))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, sqlx::Error> {
        let rows: Vec<(String, String, String, Option<String>, String, String, i64)> =
            sqlx::query_as(
                // No placeholders, so this one runs verbatim on both dialects.
                "SELECT s.id, s.user_id, s.filename, s.csv_metadata, s.created_at, s.updated_at, \
                        (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.id) \
                     FROM chat_sessions s ORDER BY s.created_at DESC",
            )
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, user_id, filename, csv_metadata, created_at, updated_at, message_count)| {
                    SessionSummary {
                        id,
                        user_id,
                        filename,
                        csv_metadata,
                        created_at: parse_ts(&created_at),
                        updated_at: parse_ts(&updated_at),
                        message_count,
                    }
                },
            )
            .collect())
    }

    async fn delete_session(&self, id: &str) -> Result<bool, sqlx::Error> {
        // Messages are deleted explicitly inside the transaction so the
        // cascade holds even when the engine's FK enforcement is off
        // (SQLite without the foreign_keys pragma).
        let mut tx = self.pool.begin().await?;
        let delete_messages = self.sql("DELETE FROM chat_messages WHERE session_id = ?1");
        sqlx::query(&delete_messages)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let delete_session = self.sql("DELETE FROM chat_sessions WHERE id = ?1");
        let deleted = sqlx::query(&delete_session)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::testutil::temp_store;
    use chrono::Utc;

    fn make_session(id: &str, filename: &str) -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: id.into(),
            user_id: "default_user".into(),
            filename: filename.into(),
            csv_data: vec![1, 2, 3],
            csv_metadata: Some(r#"{"rows":5}"#.into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_inserts_then_replaces() {
        let store = temp_store().await;
        store
            .upsert_session(make_session("s1", "first.csv"))
            .await
            .expect("insert");

        let mut replacement = make_session("s1", "second.csv");
        replacement.csv_data = vec![9, 9];
        store.upsert_session(replacement).await.expect("replace");

        let got = store.get_session("s1").await.expect("query").expect("present");
        assert_eq!(got.filename, "second.csv");
        assert_eq!(got.csv_data, vec![9, 9]);

        let all = store.list_sessions().await.expect("list");
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn get_unknown_session_is_none() {
        let store = temp_store().await;
        assert!(store.get_session("nope").await.expect("query").is_none());
    }

    #[tokio::test]
    async fn delete_reports_missing_ids() {
        let store = temp_store().await;
        store
            .upsert_session(make_session("s1", "a.csv"))
            .await
            .expect("insert");
        assert!(store.delete_session("s1").await.expect("delete"));
        assert!(!store.delete_session("s1").await.expect("second delete"));
    }
}
