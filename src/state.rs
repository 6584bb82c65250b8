//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::agent::AgentRuntime;
use crate::config::Config;
use crate::entities::AnyStore;
use crate::registry::SessionRegistry;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persistent session / message store.
    pub store: Arc<AnyStore>,
    /// In-memory conversation handles, one per session.
    pub sessions: Arc<SessionRegistry>,
    /// The model backend; swapped for a scripted one in tests.
    pub runtime: Arc<dyn AgentRuntime>,
}
