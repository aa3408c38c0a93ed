//! Per-session task

use super::{SessionCommand, SessionEvent, SessionTable};
use crate::engine::{EngineError, Turn, TurnStatus, Utterance, WorkflowEngine};
use crate::session::Session;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Owns one session and runs its turns one at a time
pub struct SessionRuntime {
    session: Session,
    engine: Arc<WorkflowEngine>,
    command_rx: mpsc::Receiver<SessionCommand>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
    sessions: SessionTable,
}

impl SessionRuntime {
    pub(crate) fn new(
        session: Session,
        engine: Arc<WorkflowEngine>,
        command_rx: mpsc::Receiver<SessionCommand>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        cancel: CancellationToken,
        sessions: SessionTable,
    ) -> Self {
        Self {
            session,
            engine,
            command_rx,
            broadcast_tx,
            cancel,
            sessions,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session.id(), "Starting session runtime");

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                command = self.command_rx.recv() => match command {
                    Some(command) => {
                        let (input, reply) = match command {
                            SessionCommand::UserMessage { text, reply } => (Some(text), reply),
                            SessionCommand::Resume { reply } => (None, reply),
                        };
                        let Some(outcome) = self.handle_message(input.as_deref()).await else {
                            break;
                        };
                        if !self.session.is_active() {
                            // Unregister before answering so the caller never
                            // sees a finished session as live
                            self.sessions.write().await.remove(self.session.id());
                            let _ = reply.send(outcome);
                            break;
                        }
                        let _ = reply.send(outcome);
                    }
                    None => break,
                },
            }
        }

        tracing::info!(
            session_id = %self.session.id(),
            phase = %self.session.phase(),
            "Session runtime stopped"
        );
    }

    /// Run one turn, or resume an interrupted one when `input` is `None`.
    /// `None` when the session was cancelled mid-turn.
    async fn handle_message(&mut self, input: Option<&str>) -> Option<Result<Turn, EngineError>> {
        let broadcast_tx = &self.broadcast_tx;
        let on_utterance = |utterance: &Utterance| {
            let _ = broadcast_tx.send(SessionEvent::Utterance {
                handler: utterance.handler.clone(),
                text: utterance.text.clone(),
            });
        };
        let engine = &self.engine;
        let session = &mut self.session;
        let step = async move {
            match input {
                Some(text) => engine.step_with(session, text, on_utterance).await,
                None => engine.resume_with(session, on_utterance).await,
            }
        };

        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                tracing::info!("Turn cancelled");
                return None;
            }
            outcome = step => outcome,
        };

        let event = match &outcome {
            Ok(turn) if turn.status == TurnStatus::Complete => SessionEvent::WorkflowComplete {
                state: turn.state.clone(),
            },
            Ok(turn) => SessionEvent::TurnComplete {
                steps: turn.steps,
                state: turn.state.clone(),
            },
            Err(e) => SessionEvent::Error {
                message: e.to_string(),
                fatal: e.is_fatal(),
            },
        };
        let _ = self.broadcast_tx.send(event);
        Some(outcome)
    }
}
