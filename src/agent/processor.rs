//! The query pipeline: agent first, heuristics second.
//!
//! An explicit two-stage flow with a typed result saying which path produced
//! the answer.  Fallback triggers only on upstream (model/network/timeout)
//! failures; registry or persistence problems are real bugs and propagate.

use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::registry::SessionRegistry;

use super::events::extract_text;
use super::fallback;
use super::runtime::{AgentRuntime, RunInput};

/// Application/user identity under which conversation handles are keyed.
pub const APP_NAME: &str = "csvchat";
pub const USER_ID: &str = "default_user";

/// Returned when the run completed but no event carried any text.
pub const NO_RESPONSE_TEXT: &str =
    "I received your query but couldn't generate a response. Please try rephrasing your question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Agent,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

/// Produce one text reply for `query` against `dataset`, remembering the
/// exchange on the session's conversation handle either way.
pub async fn process_query(
    runtime: &dyn AgentRuntime,
    registry: &SessionRegistry,
    session_id: &str,
    query: &str,
    dataset: &Dataset,
) -> Answer {
    let handle = registry.get_or_create(APP_NAME, USER_ID, session_id);
    let history = handle.history();

    let answer = match runtime
        .run(RunInput { history: &history, query, dataset })
        .await
    {
        Ok(events) => {
            let text = extract_text(&events).unwrap_or_else(|| NO_RESPONSE_TEXT.to_owned());
            info!(session_id, events = events.len(), "agent run produced a reply");
            Answer { text, source: AnswerSource::Agent }
        }
        Err(upstream) => {
            warn!(session_id, error = %upstream, "agent run failed; using heuristic fallback");
            Answer {
                text: fallback::answer(query, dataset, &upstream.0),
                source: AnswerSource::Fallback,
            }
        }
    };

    handle.append_exchange(query, &answer.text);
    answer
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::agent::events::AgentEvent;
    use crate::agent::runtime::UpstreamError;
    use async_trait::async_trait;

    /// Scripted runtime: either emits a fixed event list or fails upstream.
    pub struct Scripted {
        pub outcome: Result<Vec<AgentEvent>, String>,
    }

    #[async_trait]
    impl AgentRuntime for Scripted {
        async fn run(&self, _input: RunInput<'_>) -> Result<Vec<AgentEvent>, UpstreamError> {
            self.outcome.clone().map_err(UpstreamError)
        }
    }

    fn text_events(parts: &[&str]) -> Vec<AgentEvent> {
        parts
            .iter()
            .map(|p| AgentEvent::Text { text: (*p).to_owned() })
            .collect()
    }

    #[tokio::test]
    async fn agent_text_is_joined_and_recorded() {
        let registry = SessionRegistry::new();
        let ds = crate::dataset::fixtures::sales();
        let runtime = Scripted { outcome: Ok(text_events(&["part one", "part two"])) };

        let answer = process_query(&runtime, &registry, "s1", "hello", &ds).await;
        assert_eq!(answer.source, AnswerSource::Agent);
        assert_eq!(answer.text, "part one\npart two");

        let handle = registry.get("csvchat", "default_user", "s1").expect("handle exists");
        assert_eq!(handle.len(), 2);
    }

    #[tokio::test]
    async fn empty_run_returns_fixed_message() {
        let registry = SessionRegistry::new();
        let ds = crate::dataset::fixtures::sales();
        let runtime = Scripted { outcome: Ok(vec![]) };

        let answer = process_query(&runtime, &registry, "s1", "hello", &ds).await;
        assert_eq!(answer.text, NO_RESPONSE_TEXT);
    }

    #[tokio::test]
    async fn upstream_failure_falls_back_to_heuristics() {
        let registry = SessionRegistry::new();
        let ds = crate::dataset::fixtures::sales();
        let runtime = Scripted { outcome: Err("connection refused".into()) };

        let answer = process_query(&runtime, &registry, "s1", "mean of sales", &ds).await;
        assert_eq!(answer.source, AnswerSource::Fallback);
        assert_eq!(answer.text, "Mean of sales: 176.00");
    }

    #[tokio::test]
    async fn fallback_exchanges_still_build_history() {
        let registry = SessionRegistry::new();
        let ds = crate::dataset::fixtures::sales();
        let runtime = Scripted { outcome: Err("boom".into()) };

        process_query(&runtime, &registry, "s1", "total sales", &ds).await;
        process_query(&runtime, &registry, "s1", "columns?", &ds).await;
        let handle = registry.get("csvchat", "default_user", "s1").expect("handle exists");
        assert_eq!(handle.len(), 4);
    }
}
