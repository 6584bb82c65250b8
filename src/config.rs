//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for csvchat-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set (apart from the provider API key
/// the `genai` client reads itself, e.g. `GEMINI_API_KEY`).
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// Database URL (default: `"sqlite://csvchat.db?mode=rwc"`).
    /// Supports any sqlx-compatible connection string – swap the scheme to
    /// `postgres://…` to store sessions in Postgres.
    pub database_url: String,

    /// Hosted model identifier passed to the genai client.
    pub model: String,

    /// Upper bound in seconds for a single model call.
    pub model_timeout_secs: u64,

    /// `tracing` filter string, e.g. `"info"` or `"debug,sqlx=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Serve Swagger UI at `/swagger-ui` (default: `true`).
    pub enable_swagger: bool,

    /// Comma-separated CORS origin allow-list; `None` means wildcard.
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("CSVCHAT_BIND", "0.0.0.0:8000"),
            database_url: env_or("DATABASE_URL", "sqlite://csvchat.db?mode=rwc"),
            model: env_or("CSVCHAT_MODEL", "gemini-2.0-flash"),
            model_timeout_secs: parse_env("CSVCHAT_MODEL_TIMEOUT_SECS", 60),
            log_level: env_or("CSVCHAT_LOG", "info"),
            log_json: std::env::var("CSVCHAT_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            enable_swagger: std::env::var("CSVCHAT_ENABLE_SWAGGER")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
            cors_allowed_origins: std::env::var("CSVCHAT_CORS_ORIGINS").ok(),
        }
    }

    /// Human-readable storage label for API responses (`"postgresql"` or
    /// `"sqlite"`), derived from the connection string scheme.
    pub fn storage_label(&self) -> &'static str {
        if self.database_url.starts_with("postgres") {
            "postgresql"
        } else {
            "sqlite"
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn storage_label_follows_scheme() {
        let mut cfg = Config::from_env();
        cfg.database_url = "postgres://u:p@localhost/csvchat".into();
        assert_eq!(cfg.storage_label(), "postgresql");
        cfg.database_url = "sqlite://csvchat.db".into();
        assert_eq!(cfg.storage_label(), "sqlite");
    }
}
