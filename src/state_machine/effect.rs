//! Effects produced by state transitions

use crate::backend::{ChatRequest, Document};
use crate::session::Role;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Empty the pending text input
    ClearInput,

    /// Append a message to the history
    AppendMessage { role: Role, content: String },

    /// Bind the server-assigned conversation id (no-op once bound)
    BindConversation { id: String },

    /// Issue the chat call (spawns as background task)
    RequestChat { request: ChatRequest },

    /// Issue the ingestion call (spawns as background task)
    RequestUpload { document: Document },

    /// Reset the file picker so the same file can be picked again
    ResetFilePicker,

    /// Replace the session wholesale
    ResetSession,
}

impl Effect {
    pub fn user_message(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant_message(content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
