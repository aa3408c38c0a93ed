//! Session runtime
//!
//! Each session runs in its own tokio task that exclusively owns the
//! [`Session`](crate::session::Session). Callers talk to it through the
//! [`RuntimeManager`]: user messages go in over an mpsc channel and are
//! answered with the finished [`Turn`]; utterances and turn results are
//! also broadcast as [`SessionEvent`]s. Sessions share nothing but the
//! engine, which is read-only.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::engine::{EngineError, Turn, WorkflowEngine};
use crate::router::HandlerName;
use crate::session::SessionState;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio_util::sync::CancellationToken;

pub(crate) type SessionTable = Arc<RwLock<HashMap<String, SessionHandle>>>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("session {0} stopped before answering")]
    SessionStopped(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Commands accepted by a session task
#[derive(Debug)]
pub enum SessionCommand {
    UserMessage {
        text: String,
        reply: oneshot::Sender<Result<Turn, EngineError>>,
    },
    /// Continue an interrupted hand-off without new input
    Resume {
        reply: oneshot::Sender<Result<Turn, EngineError>>,
    },
}

/// Events broadcast to session subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Utterance {
        handler: HandlerName,
        text: String,
    },
    TurnComplete {
        steps: usize,
        state: SessionState,
    },
    WorkflowComplete {
        state: SessionState,
    },
    Error {
        message: String,
        fatal: bool,
    },
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub command_tx: mpsc::Sender<SessionCommand>,
    pub broadcast_tx: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

/// Manager for all session runtimes
pub struct RuntimeManager {
    engine: Arc<WorkflowEngine>,
    sessions: SessionTable,
}

impl RuntimeManager {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self {
            engine,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    /// Start a session with default state and return its id
    pub async fn create_session(&self) -> String {
        self.create_session_with_state(SessionState::default()).await
    }

    /// Start a session from a state persisted by the caller; its total is
    /// repriced against the engine's catalog
    pub async fn create_session_with_state(&self, state: SessionState) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let (command_tx, command_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let cancel = CancellationToken::new();

        let runtime = SessionRuntime::new(
            self.engine.restore_session(&id, state),
            self.engine.clone(),
            command_rx,
            broadcast_tx.clone(),
            cancel.clone(),
            self.sessions.clone(),
        );

        self.sessions.write().await.insert(
            id.clone(),
            SessionHandle {
                command_tx,
                broadcast_tx,
                cancel,
            },
        );

        let session_id = id.clone();
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            runtime.run().await;
            sessions.write().await.remove(&session_id);
            tracing::info!(session_id = %session_id, "Session runtime finished");
        });

        tracing::info!(session_id = %id, "Session started");
        id
    }

    async fn handle(&self, session_id: &str) -> Result<SessionHandle, RuntimeError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| RuntimeError::SessionNotFound(session_id.to_string()))
    }

    /// Deliver one user utterance and wait for the turn it produces
    pub async fn send_message(&self, session_id: &str, text: &str) -> Result<Turn, RuntimeError> {
        let text = text.to_string();
        self.request(session_id, |reply| SessionCommand::UserMessage { text, reply })
            .await
    }

    /// Rerun a hand-off whose handler failed after the user's input was
    /// consumed (`EngineError::HandlerFailed { input_consumed: true, .. }`)
    pub async fn resume(&self, session_id: &str) -> Result<Turn, RuntimeError> {
        self.request(session_id, |reply| SessionCommand::Resume { reply })
            .await
    }

    async fn request<F>(&self, session_id: &str, command: F) -> Result<Turn, RuntimeError>
    where
        F: FnOnce(oneshot::Sender<Result<Turn, EngineError>>) -> SessionCommand,
    {
        let handle = self.handle(session_id).await?;
        let (reply, rx) = oneshot::channel();
        handle
            .command_tx
            .send(command(reply))
            .await
            .map_err(|_| RuntimeError::SessionStopped(session_id.to_string()))?;

        let outcome = rx
            .await
            .map_err(|_| RuntimeError::SessionStopped(session_id.to_string()))?;
        Ok(outcome?)
    }

    /// Subscribe to session updates
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<broadcast::Receiver<SessionEvent>, RuntimeError> {
        let handle = self.handle(session_id).await?;
        Ok(handle.broadcast_tx.subscribe())
    }

    /// Abandon a session. A turn in flight is dropped unanswered.
    pub async fn end_session(&self, session_id: &str) -> Result<(), RuntimeError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| RuntimeError::SessionNotFound(session_id.to_string()))?;
        handle.cancel.cancel();
        tracing::info!(session_id = %session_id, "Session ended by caller");
        Ok(())
    }

    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
