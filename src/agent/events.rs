//! Tagged events emitted by one agent run.
//!
//! The model runtime can emit text in several wire shapes; they are decoded
//! once at the boundary into this union so the rest of the pipeline never
//! inspects provider structures.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A text fragment of the final (or intermediate) reply.
    Text { text: String },
    /// The model asked for a tool invocation.
    ToolCall { name: String, args: Value },
    /// The envelope a tool produced for a call.
    ToolResult { name: String, outcome: Value },
}

/// Concatenate all text fragments with newlines; `None` when the run
/// produced no text at all.
pub fn extract_text(events: &[AgentEvent]) -> Option<String> {
    let parts: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::Text { text } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_fragments_with_newlines() {
        let events = vec![
            AgentEvent::ToolCall {
                name: "calculate_mean".into(),
                args: json!({"column": "sales"}),
            },
            AgentEvent::Text { text: "The mean is 176.".into() },
            AgentEvent::Text { text: "Anything else?".into() },
        ];
        assert_eq!(
            extract_text(&events).expect("text present"),
            "The mean is 176.\nAnything else?"
        );
    }

    #[test]
    fn no_text_yields_none() {
        let events = vec![AgentEvent::ToolResult {
            name: "sum_column".into(),
            outcome: json!({"status": "success"}),
        }];
        assert!(extract_text(&events).is_none());
    }
}
