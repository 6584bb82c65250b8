//! Database abstraction layer.
//!
//! [`SessionStore`] and [`ChatStore`] define the persistence interface; the
//! default implementation is [`AnyStore`], which works against SQLite or
//! Postgres depending on the connection string.
//!
//! All trait methods use `impl Future` in their signatures (stable since
//! Rust 1.75) so no extra `async-trait` crate is required here.

pub mod chat;
pub mod dao;
pub mod session;

pub use chat::ChatStore;
pub use dao::{ChatMessage, ChatSession, SessionSummary};
pub use session::SessionStore;

use std::borrow::Cow;
use std::str::FromStr;

/// Which SQL dialect the Any pool is speaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres") {
            Backend::Postgres
        } else {
            Backend::Sqlite
        }
    }
}

/// The Any driver forwards SQL to the backend verbatim, so bind placeholders
/// have to match the dialect: `?N` on SQLite, `$N` on Postgres.  Statements
/// are written with `?N` and rewritten here; none of them contains a literal
/// question mark.
pub(crate) fn dialect_sql(sql: &str, backend: Backend) -> Cow<'_, str> {
    match backend {
        Backend::Sqlite => Cow::Borrowed(sql),
        Backend::Postgres => Cow::Owned(sql.replace('?', "$")),
    }
}

#[derive(Clone, Debug)]
pub struct AnyStore {
    pub(crate) pool: sqlx::Pool<sqlx::Any>,
    backend: Backend,
}

impl AnyStore {
    /// Open (or create) the database at `url` and run pending migrations.
    ///
    /// `url` is any sqlx-compatible connection string, e.g.
    /// `"sqlite://csvchat.db?mode=rwc"` or `"postgres://…"`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        sqlx::any::install_default_drivers();
        let options = sqlx::any::AnyConnectOptions::from_str(url)?;
        let pool = sqlx::AnyPool::connect_with(options).await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool, backend: Backend::from_url(url) })
    }

    pub(crate) fn sql<'a>(&self, query: &'a str) -> Cow<'a, str> {
        dialect_sql(query, self.backend)
    }
}

/// Parse an RFC 3339 timestamp column, warning (not failing) on bad data.
pub(crate) fn parse_ts(raw: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored timestamp; using now");
        chrono::Utc::now()
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn backend_is_derived_from_the_url_scheme() {
        assert_eq!(Backend::from_url("postgres://db/csvchat"), Backend::Postgres);
        assert_eq!(Backend::from_url("postgresql://db/csvchat"), Backend::Postgres);
        assert_eq!(Backend::from_url("sqlite://csvchat.db?mode=rwc"), Backend::Sqlite);
    }

    #[test]
    fn postgres_placeholders_are_rewritten() {
        let sql = "INSERT INTO chat_messages (id, session_id) VALUES (?1, ?2)";
        assert_eq!(
            dialect_sql(sql, Backend::Postgres),
            "INSERT INTO chat_messages (id, session_id) VALUES ($1, $2)"
        );
        assert_eq!(dialect_sql(sql, Backend::Sqlite), sql);
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::AnyStore;

    /// Fresh file-backed SQLite store in the temp dir.  A file (rather than
    /// `:memory:`) is used because every pooled connection to an in-memory
    /// SQLite database would otherwise see its own empty schema.
    pub async fn temp_store() -> AnyStore {
        let path = std::env::temp_dir().join(format!("csvchat-test-{}.db", uuid::Uuid::new_v4()));
        let url = format!("sqlite://{}?mode=rwc", path.display());
        AnyStore::connect(&url).await.expect("test store connects")
    }
}
