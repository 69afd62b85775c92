//! Pure state transition function
//!
//! Given the current session and an event, decides the next busy state and
//! the effects to run. No I/O happens here.

use super::{Effect, Event};
use crate::backend::{ChatRequest, ClientError};
use crate::session::{BusyState, ConversationSession};
use thiserror::Error;

pub const ERROR_PREFIX: &str = "❌ Error: ";
pub const UPLOAD_ERROR_PREFIX: &str = "❌ Error uploading document: ";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: BusyState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: BusyState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A request is already in progress ({})", .0.as_str())]
    Busy(BusyState),
    #[error("Please upload a PDF, DOC, or DOCX file")]
    UnsupportedFileType { filename: String },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn upload_success_message(filename: &str) -> String {
    format!(
        "✅ Document \"{filename}\" uploaded and processed successfully! You can now ask questions about it."
    )
}

fn chat_error_message(error: &ClientError) -> String {
    format!("{ERROR_PREFIX}{}", error.message)
}

fn upload_error_message(error: &ClientError) -> String {
    format!("{UPLOAD_ERROR_PREFIX}{}", error.message)
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs.
pub fn transition(
    session: &ConversationSession,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (session.busy(), event) {
        // ============================================================
        // Reset
        // ============================================================
        (_, Event::NewChat) => {
            Ok(TransitionResult::new(BusyState::Idle).with_effect(Effect::ResetSession))
        }

        // ============================================================
        // Starting a flow
        // ============================================================

        // Idle + SendMessage -> Sending (blank input is a no-op)
        (BusyState::Idle, Event::SendMessage { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(TransitionResult::new(BusyState::Idle));
            }
            let request = ChatRequest::new(text, session.id().map(str::to_string));
            Ok(TransitionResult::new(BusyState::Sending)
                .with_effect(Effect::ClearInput)
                .with_effect(Effect::user_message(text))
                .with_effect(Effect::RequestChat { request }))
        }

        // Idle + UploadDocument -> Uploading, after the file-type gate
        (BusyState::Idle, Event::UploadDocument { document }) => {
            if !document.is_supported() {
                return Err(TransitionError::UnsupportedFileType {
                    filename: document.filename,
                });
            }
            Ok(TransitionResult::new(BusyState::Uploading)
                .with_effect(Effect::RequestUpload { document }))
        }

        // Busy + any new flow -> Reject, never queue
        (
            busy @ (BusyState::Sending | BusyState::Uploading),
            Event::SendMessage { .. } | Event::UploadDocument { .. },
        ) => Err(TransitionError::Busy(busy)),

        // ============================================================
        // Settling a flow
        // ============================================================
        (BusyState::Sending, Event::ChatCompleted { response, .. }) => {
            let mut result = TransitionResult::new(BusyState::Idle)
                .with_effect(Effect::assistant_message(response.response));
            if session.id().is_none() {
                result = result.with_effect(Effect::BindConversation {
                    id: response.conversation_id,
                });
            }
            Ok(result)
        }

        (BusyState::Sending, Event::ChatFailed { error, .. }) => Ok(TransitionResult::new(
            BusyState::Idle,
        )
        .with_effect(Effect::assistant_message(chat_error_message(&error)))),

        (BusyState::Uploading, Event::UploadCompleted { response, .. }) => {
            Ok(TransitionResult::new(BusyState::Idle)
                .with_effect(Effect::assistant_message(upload_success_message(
                    &response.filename,
                )))
                .with_effect(Effect::ResetFilePicker))
        }

        (BusyState::Uploading, Event::UploadFailed { error, .. }) => {
            Ok(TransitionResult::new(BusyState::Idle)
                .with_effect(Effect::assistant_message(upload_error_message(&error)))
                .with_effect(Effect::ResetFilePicker))
        }

        // ============================================================
        // Default: Invalid transition
        // ============================================================
        (busy, event) => Err(TransitionError::InvalidTransition(format!(
            "{} while {}",
            event.name(),
            busy.as_str()
        ))),
    }
}

/// Refuse to start a flow while a call from a discarded session is still
/// running.
///
/// A new chat leaves the session idle, but the call it orphaned keeps the
/// backend occupied until it settles. `orphaned` is that call's busy state.
pub fn check_orphaned(orphaned: Option<BusyState>, event: &Event) -> Result<(), TransitionError> {
    match (orphaned, event) {
        (Some(busy), Event::SendMessage { .. } | Event::UploadDocument { .. }) => {
            Err(TransitionError::Busy(busy))
        }
        _ => Ok(()),
    }
}
