//! Events that can occur in a session

use crate::backend::{ChatResponse, ClientError, Document, UploadResponse};

/// Events that trigger state transitions.
///
/// Completion events carry the epoch of the session that issued the call,
/// so the runtime can drop completions that outlived a reset.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    SendMessage {
        text: String,
    },
    UploadDocument {
        document: Document,
    },
    NewChat,

    // Backend completions
    ChatCompleted {
        epoch: u64,
        response: ChatResponse,
    },
    ChatFailed {
        epoch: u64,
        error: ClientError,
    },
    UploadCompleted {
        epoch: u64,
        response: UploadResponse,
    },
    UploadFailed {
        epoch: u64,
        error: ClientError,
    },
}

impl Event {
    /// Epoch of the originating session, for completion events
    pub fn epoch(&self) -> Option<u64> {
        match self {
            Event::ChatCompleted { epoch, .. }
            | Event::ChatFailed { epoch, .. }
            | Event::UploadCompleted { epoch, .. }
            | Event::UploadFailed { epoch, .. } => Some(*epoch),
            Event::SendMessage { .. } | Event::UploadDocument { .. } | Event::NewChat => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::SendMessage { .. } => "send_message",
            Event::UploadDocument { .. } => "upload_document",
            Event::NewChat => "new_chat",
            Event::ChatCompleted { .. } => "chat_completed",
            Event::ChatFailed { .. } => "chat_failed",
            Event::UploadCompleted { .. } => "upload_completed",
            Event::UploadFailed { .. } => "upload_failed",
        }
    }
}
