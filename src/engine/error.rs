//! Engine error types

use super::Turn;
use crate::llm::ModelError;
use crate::router::HandlerName;
use crate::session::SessionPhase;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Routing named a handler the registry doesn't have
    #[error("no handler registered under '{0}'")]
    UnknownHandler(HandlerName),

    /// Routing kept handing off without settling
    #[error("iteration limit of {limit} reached at handler {last_handler}; state: {state_dump}")]
    IterationLimit {
        limit: usize,
        last_handler: HandlerName,
        state_dump: String,
    },

    /// The handler's model call failed; the session stays usable.
    ///
    /// `partial` holds what earlier handlers of the same call said and
    /// committed. When `input_consumed` is false nothing happened and the
    /// same input can be sent again; otherwise the input already reached a
    /// handler and the call is continued with
    /// [`WorkflowEngine::resume`](super::WorkflowEngine::resume).
    #[error("handler {handler} failed: {source}")]
    HandlerFailed {
        handler: HandlerName,
        #[source]
        source: ModelError,
        partial: Box<Turn>,
        input_consumed: bool,
    },

    #[error("session {id} is {phase} and accepts no more input")]
    SessionClosed { id: String, phase: SessionPhase },
}

impl EngineError {
    /// Fatal errors abort the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownHandler(_) | Self::IterationLimit { .. })
    }

    /// Utterances and state produced before a handler failure
    pub fn partial_turn(&self) -> Option<&Turn> {
        match self {
            Self::HandlerFailed { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Whether trying again might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HandlerFailed { source, .. } => source.kind.is_retryable(),
            _ => false,
        }
    }
}
