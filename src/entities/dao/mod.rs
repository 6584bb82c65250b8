pub mod chat;
pub mod session;

pub use chat::ChatMessage;
pub use session::{ChatSession, SessionSummary};
