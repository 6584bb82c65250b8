//! Agent factory and query pipeline.
//!
//! `instruction` + `tools_schema` assemble the agent (configuration, not an
//! algorithm); `runtime` binds it to the hosted model; `processor` turns a
//! user query into one text reply with a heuristic fallback path.

pub mod events;
pub mod fallback;
pub mod instruction;
pub mod processor;
pub mod runtime;
pub mod tools_schema;

pub use events::AgentEvent;
pub use processor::{process_query, Answer, AnswerSource};
pub use runtime::{AgentRuntime, GenaiRuntime, RunInput, UpstreamError};
