//! Session runtime executor

use super::{Command, SessionEvent};
use crate::backend::{Backend, ChatRequest, ClientError, Document, Operation};
use crate::config::ClientConfig;
use crate::session::{BusyState, ConversationSession, Message};
use crate::state_machine::{check_orphaned, transition, Effect, Event, TransitionError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

/// Builds the failure event reported when a call ends without settling
type AbandonedEvent = fn(u64, ClientError) -> Event;

/// The outbound call that has not settled yet
#[derive(Debug, Clone, Copy)]
struct InFlight {
    epoch: u64,
    busy: BusyState,
}

/// Owns the session and applies events to it one at a time
pub struct SessionRuntime<B: Backend + 'static> {
    config: ClientConfig,
    session: ConversationSession,
    /// Survives `reset()`, so a call orphaned by a new chat still counts
    in_flight: Option<InFlight>,
    backend: Arc<B>,
    command_rx: mpsc::Receiver<Command>,
    /// Weak so the runtime stops once every handle is gone
    command_tx: mpsc::WeakSender<Command>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<ConversationSession>,
}

impl<B: Backend + 'static> SessionRuntime<B> {
    pub fn new(
        config: ClientConfig,
        backend: B,
        command_rx: mpsc::Receiver<Command>,
        command_tx: mpsc::WeakSender<Command>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        snapshot_tx: watch::Sender<ConversationSession>,
    ) -> Self {
        Self {
            config,
            session: ConversationSession::new(),
            in_flight: None,
            backend: Arc::new(backend),
            command_rx,
            command_tx,
            broadcast_tx,
            snapshot_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(base_url = %self.config.base_url, "Starting session runtime");

        // One command at a time: every dispatch is atomic with respect to
        // every other dispatch and completion
        while let Some(Command { event, reply }) = self.command_rx.recv().await {
            let event_name = event.name();
            let outcome = self.process_event(event);

            // Publish before replying so a caller that waits on the snapshot
            // never sees the state from before its own action
            self.snapshot_tx.send_replace(self.session.clone());

            if let Err(e) = &outcome {
                tracing::warn!(event = event_name, error = %e, "Event rejected");
                if reply.is_some() {
                    let _ = self.broadcast_tx.send(SessionEvent::Rejected {
                        reason: e.to_string(),
                    });
                }
            }
            if let Some(reply) = reply {
                let _ = reply.send(outcome.map(|()| self.session.busy()));
            }
        }

        tracing::info!("Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        if let Some(epoch) = event.epoch() {
            if self.in_flight.is_some_and(|call| call.epoch == epoch) {
                self.in_flight = None;
            }
            if epoch != self.session.epoch() {
                tracing::debug!(
                    event = event.name(),
                    epoch,
                    current_epoch = self.session.epoch(),
                    "Discarding completion from a previous session"
                );
                return Ok(());
            }
        }

        let orphaned = self
            .in_flight
            .filter(|call| call.epoch != self.session.epoch())
            .map(|call| call.busy);
        check_orphaned(orphaned, &event)?;

        let event_name = event.name();
        let result = transition(&self.session, event)?;
        let old_state = self.session.busy();

        tracing::debug!(
            event = event_name,
            from = old_state.as_str(),
            to = result.new_state.as_str(),
            effects = result.effects.len(),
            "Transition"
        );

        for effect in result.effects {
            self.execute_effect(effect);
        }

        // Applied after the effects; nothing can observe the gap because
        // the next command is only read once this one is finished
        self.session.set_busy(result.new_state);
        if old_state != result.new_state {
            let _ = self.broadcast_tx.send(SessionEvent::BusyChanged {
                busy: result.new_state,
            });
        }

        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ClearInput => {
                let _ = self.broadcast_tx.send(SessionEvent::InputCleared);
            }

            Effect::AppendMessage { role, content } => {
                let message = Message::new(role, content);
                self.session.append(message.clone());
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::MessageAppended { message });
            }

            Effect::BindConversation { id } => {
                if self.session.bind_id(id.clone()) {
                    tracing::info!(conversation_id = %id, "Conversation bound");
                    let _ = self
                        .broadcast_tx
                        .send(SessionEvent::ConversationBound { id });
                }
            }

            Effect::RequestChat { request } => self.spawn_chat(request),

            Effect::RequestUpload { document } => self.spawn_upload(document),

            Effect::ResetFilePicker => {
                let _ = self.broadcast_tx.send(SessionEvent::FilePickerReset);
            }

            Effect::ResetSession => {
                self.session.reset();
                tracing::info!(epoch = self.session.epoch(), "Started a new chat");
                let _ = self.broadcast_tx.send(SessionEvent::SessionReset);
            }
        }
    }

    fn settlement(&self, on_abandon: AbandonedEvent) -> Option<Settlement> {
        let Some(tx) = self.command_tx.upgrade() else {
            tracing::warn!("No session handles left; not issuing request");
            return None;
        };
        Some(Settlement {
            tx: Some(tx),
            epoch: self.session.epoch(),
            on_abandon,
        })
    }

    fn spawn_chat(&mut self, request: ChatRequest) {
        let Some(settlement) = self.settlement(|epoch, error| Event::ChatFailed { epoch, error })
        else {
            return;
        };
        let backend = self.backend.clone();
        let bound = self.config.timeout_for(Operation::Chat);
        let epoch = self.session.epoch();
        self.in_flight = Some(InFlight {
            epoch,
            busy: BusyState::Sending,
        });

        tokio::spawn(async move {
            let event = match bounded(Operation::Chat, bound, backend.chat(&request)).await {
                Ok(response) => Event::ChatCompleted { epoch, response },
                Err(error) => Event::ChatFailed { epoch, error },
            };
            settlement.settle(event).await;
        });
    }

    fn spawn_upload(&mut self, document: Document) {
        let Some(settlement) =
            self.settlement(|epoch, error| Event::UploadFailed { epoch, error })
        else {
            return;
        };
        let backend = self.backend.clone();
        let bound = self.config.timeout_for(Operation::Upload);
        let epoch = self.session.epoch();
        self.in_flight = Some(InFlight {
            epoch,
            busy: BusyState::Uploading,
        });

        tokio::spawn(async move {
            let event =
                match bounded(Operation::Upload, bound, backend.upload_document(&document)).await {
                    Ok(response) => Event::UploadCompleted { epoch, response },
                    Err(error) => Event::UploadFailed { epoch, error },
                };
            settlement.settle(event).await;
        });
    }
}

/// Run `call`, giving up with a timeout error once `bound` elapses
async fn bounded<T>(
    operation: Operation,
    bound: Duration,
    call: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    if let Ok(result) = tokio::time::timeout(bound, call).await {
        result
    } else {
        tracing::warn!(
            operation = operation.as_str(),
            bound_ms = %bound.as_millis(),
            "Backend call exceeded its bound"
        );
        Err(ClientError::timeout(operation))
    }
}

/// Guarantees exactly one completion per outbound call.
///
/// If the call's task ends without calling [`Settlement::settle`] (for
/// example because the backend panicked), dropping the guard reports an
/// unknown failure instead so the session still returns to idle.
struct Settlement {
    tx: Option<mpsc::Sender<Command>>,
    epoch: u64,
    on_abandon: AbandonedEvent,
}

impl Settlement {
    async fn settle(mut self, event: Event) {
        if let Some(tx) = self.tx.take() {
            if tx.send(Command::completion(event)).await.is_err() {
                tracing::debug!("Session runtime gone, dropping completion");
            }
        }
    }
}

impl Drop for Settlement {
    fn drop(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        tracing::error!(epoch = self.epoch, "Backend call ended without a result");
        let event = (self.on_abandon)(
            self.epoch,
            ClientError::unknown("Request ended without a result"),
        );
        if let Err(mpsc::error::TrySendError::Full(command)) =
            tx.try_send(Command::completion(event))
        {
            tokio::spawn(async move {
                let _ = tx.send(command).await;
            });
        }
    }
}
