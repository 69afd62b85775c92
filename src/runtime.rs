//! Runtime for driving the session
//!
//! A single actor owns the `ConversationSession` and is the only writer.
//! Front ends hold a cloneable `SessionHandle`: user actions are dispatched
//! as commands and answered once the transition has been applied, and the
//! session is observable through a snapshot and a notification stream.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::backend::{Backend, Document};
use crate::config::ClientConfig;
use crate::session::{BusyState, ConversationSession, Message};
use crate::state_machine::{Event, TransitionError};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Where the runtime reports the outcome of a user action
pub type DispatchReply = oneshot::Sender<Result<BusyState, TransitionError>>;

/// An event queued for the runtime
pub struct Command {
    pub event: Event,
    /// Present for user actions, absent for backend completions
    pub reply: Option<DispatchReply>,
}

impl Command {
    pub fn completion(event: Event) -> Self {
        Self { event, reply: None }
    }
}

/// Notifications sent to front ends
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MessageAppended { message: Message },
    BusyChanged { busy: BusyState },
    ConversationBound { id: String },
    InputCleared,
    FilePickerReset,
    SessionReset,
    /// A user action was refused before any request was made
    Rejected { reason: String },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session runtime has stopped")]
    Stopped,
    #[error(transparent)]
    Rejected(#[from] TransitionError),
}

/// Handle to interact with the running session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot_rx: watch::Receiver<ConversationSession>,
}

/// Spawn the session runtime, returning a handle to it.
///
/// The runtime stops once every handle is dropped and no call is in flight.
pub fn start<B: Backend + 'static>(config: ClientConfig, backend: B) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let (snapshot_tx, snapshot_rx) = watch::channel(ConversationSession::new());

    let runtime = SessionRuntime::new(
        config,
        backend,
        command_rx,
        command_tx.downgrade(),
        broadcast_tx.clone(),
        snapshot_tx,
    );

    tokio::spawn(async move {
        runtime.run().await;
        tracing::info!("Session runtime finished");
    });

    SessionHandle {
        command_tx,
        broadcast_tx,
        snapshot_rx,
    }
}

impl SessionHandle {
    /// Queue a user action and wait for the transition it caused.
    ///
    /// Returns the busy state right after the action was applied; local
    /// rejections (busy, unsupported file type) come back as errors.
    async fn dispatch(&self, event: Event) -> Result<BusyState, RuntimeError> {
        let (reply, outcome) = oneshot::channel();
        self.command_tx
            .send(Command {
                event,
                reply: Some(reply),
            })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        let outcome = outcome.await.map_err(|_| RuntimeError::Stopped)?;
        outcome.map_err(RuntimeError::from)
    }

    pub async fn send_message(&self, text: impl Into<String>) -> Result<BusyState, RuntimeError> {
        self.dispatch(Event::SendMessage { text: text.into() }).await
    }

    pub async fn upload_document(&self, document: Document) -> Result<BusyState, RuntimeError> {
        self.dispatch(Event::UploadDocument { document }).await
    }

    /// Discard the session and start over
    pub async fn new_chat(&self) -> Result<BusyState, RuntimeError> {
        self.dispatch(Event::NewChat).await
    }

    #[allow(dead_code)] // For front ends that render incrementally
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Copy of the session as of the last processed event
    #[allow(dead_code)] // For front ends that render incrementally
    pub fn snapshot(&self) -> ConversationSession {
        self.snapshot_rx.borrow().clone()
    }

    /// Wait until no call is in flight
    pub async fn wait_until_idle(&self) -> Result<ConversationSession, RuntimeError> {
        let mut rx = self.snapshot_rx.clone();
        let session = rx
            .wait_for(|s| s.busy().is_idle())
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        Ok((*session).clone())
    }
}
