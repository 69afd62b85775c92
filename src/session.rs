//! Conversation session state
//!
//! The single live session: ordered message history, the server-assigned
//! conversation id, and the busy flag guarding outbound calls.

mod message;
mod state;

pub use message::{Message, Role};
pub use state::{BusyState, ConversationSession};
