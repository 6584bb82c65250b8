//! Hosted-model runtime binding.
//!
//! [`GenaiRuntime`] drives a bounded tool-call loop against the configured
//! model: present the tool declarations, dispatch any requested calls to
//! [`DataTools`], feed the envelopes back, and collect everything the model
//! emitted as [`AgentEvent`]s.  Each model round is wrapped in an explicit
//! timeout so no request blocks longer than one bounded model call.

use std::time::Duration;

use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ToolResponse};
use genai::Client;
use tracing::{debug, warn};

use crate::dataset::tools::DataTools;
use crate::dataset::Dataset;
use crate::registry::{Role, Turn};

use super::events::AgentEvent;
use super::{instruction, tools_schema};

/// Upper bound on tool-call rounds in a single turn; past this the model is
/// looping rather than converging.
const MAX_TOOL_ROUNDS: usize = 6;

/// A model-side failure: network, provider, or timeout.  This is the only
/// failure class the query pipeline recovers from via heuristics.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UpstreamError(pub String);

/// Everything one agent run needs.
pub struct RunInput<'a> {
    pub history: &'a [Turn],
    pub query: &'a str,
    pub dataset: &'a Dataset,
}

/// Seam between the query pipeline and the hosted model, so tests can run
/// against a scripted implementation.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(&self, input: RunInput<'_>) -> Result<Vec<AgentEvent>, UpstreamError>;
}

pub struct GenaiRuntime {
    client: Client,
    model: String,
    timeout: Duration,
}

impl GenaiRuntime {
    pub fn new(model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
            timeout,
        }
    }

    async fn exec_round(
        &self,
        chat_req: ChatRequest,
        options: &ChatOptions,
    ) -> Result<genai::chat::ChatResponse, UpstreamError> {
        let call = self.client.exec_chat(&self.model, chat_req, Some(options));
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(res)) => Ok(res),
            Ok(Err(e)) => Err(UpstreamError(format!("model call failed: {e}"))),
            Err(_) => Err(UpstreamError(format!(
                "model call timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl AgentRuntime for GenaiRuntime {
    async fn run(&self, input: RunInput<'_>) -> Result<Vec<AgentEvent>, UpstreamError> {
        let tools = DataTools::new(input.dataset);

        let mut messages = vec![ChatMessage::system(instruction::build(input.dataset))];
        for turn in input.history {
            messages.push(match turn.role {
                Role::User => ChatMessage::user(turn.text.clone()),
                Role::Assistant => ChatMessage::assistant(turn.text.clone()),
            });
        }
        messages.push(ChatMessage::user(input.query));

        let mut chat_req = ChatRequest::new(messages).with_tools(tools_schema::declarations());
        let options = ChatOptions::default().with_temperature(0.2);

        let mut events = Vec::new();
        for round in 0..MAX_TOOL_ROUNDS {
            let res = self.exec_round(chat_req.clone(), &options).await?;

            // A single response can carry several text parts; keep them all
            // so extraction can join them later.
            collect_text_events(&mut events, res.texts());

            let tool_calls = res.into_tool_calls();
            if tool_calls.is_empty() {
                return Ok(events);
            }

            debug!(round, calls = tool_calls.len(), "model requested tool calls");
            chat_req = chat_req.append_message(tool_calls.clone());
            for call in tool_calls {
                let outcome = tools.dispatch(&call.fn_name, &call.fn_arguments);
                events.push(AgentEvent::ToolCall {
                    name: call.fn_name.clone(),
                    args: call.fn_arguments.clone(),
                });
                events.push(AgentEvent::ToolResult {
                    name: call.fn_name.clone(),
                    outcome: outcome.clone(),
                });
                chat_req = chat_req
                    .append_message(ToolResponse::new(call.call_id, outcome.to_string()));
            }
        }

        warn!(
            max_rounds = MAX_TOOL_ROUNDS,
            "tool-call loop hit the round limit without a final text turn"
        );
        Ok(events)
    }
}

/// One [`AgentEvent::Text`] per non-empty fragment.
fn collect_text_events<'a>(events: &mut Vec<AgentEvent>, texts: impl IntoIterator<Item = &'a str>) {
    for text in texts {
        if !text.is_empty() {
            events.push(AgentEvent::Text { text: text.to_owned() });
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::agent::events::extract_text;

    #[test]
    fn every_text_fragment_becomes_an_event() {
        let mut events = Vec::new();
        collect_text_events(&mut events, ["The mean is 176.00.", "", "Anything else?"]);
        assert_eq!(events.len(), 2);
        assert_eq!(
            extract_text(&events).expect("text present"),
            "The mean is 176.00.\nAnything else?"
        );
    }

    #[test]
    fn empty_fragments_leave_no_events() {
        let mut events = Vec::new();
        collect_text_events(&mut events, ["", ""]);
        assert!(events.is_empty());
    }
}
