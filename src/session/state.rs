//! Session state types

use super::Message;
use serde::{Deserialize, Serialize};

/// Which outbound call, if any, is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BusyState {
    /// Ready for a send or an upload
    #[default]
    Idle,
    /// Chat request in flight
    Sending,
    /// Document upload in flight
    Uploading,
}

impl BusyState {
    pub fn is_idle(self) -> bool {
        matches!(self, BusyState::Idle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BusyState::Idle => "idle",
            BusyState::Sending => "sending",
            BusyState::Uploading => "uploading",
        }
    }
}

/// The one live conversation.
///
/// `messages` is append-only and `id` is bound at most once. The only way
/// to discard either is [`ConversationSession::reset`], which replaces the
/// whole value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationSession {
    id: Option<String>,
    messages: Vec<Message>,
    busy: BusyState,
    /// Bumped on every reset so late completions from a discarded
    /// session can be recognised
    #[serde(skip)]
    epoch: u64,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn busy(&self) -> BusyState {
        self.busy
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn set_busy(&mut self, busy: BusyState) {
        self.busy = busy;
    }

    /// Bind the server-assigned conversation id.
    ///
    /// Returns `false` (and leaves the session untouched) if an id is
    /// already bound.
    pub fn bind_id(&mut self, id: impl Into<String>) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id.into());
        true
    }

    /// Discard history and id, starting a fresh session
    pub fn reset(&mut self) {
        let epoch = self.epoch.wrapping_add(1);
        *self = Self {
            epoch,
            ..Self::default()
        };
    }
}
