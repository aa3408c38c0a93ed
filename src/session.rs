//! Conversation session
//!
//! A session owns the order state, the transcript handlers read for
//! context, and the lifecycle phase the engine uses to refuse input once
//! the workflow has finished or been aborted.

mod delta;
mod state;
mod status;

pub use delta::{DeltaError, StateDelta};
pub use state::SessionState;
pub use status::{OrderStatus, OrderType};

use crate::router::HandlerName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who spoke a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    /// Handler that produced an assistant entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerName>,
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Accepting user input
    Active,
    /// Routing reached the terminal sentinel
    Complete,
    /// A fatal engine error ended the session
    Aborted,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionPhase::Active => "active",
            SessionPhase::Complete => "complete",
            SessionPhase::Aborted => "aborted",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    pub(crate) state: SessionState,
    pub(crate) transcript: Vec<TranscriptEntry>,
    pub(crate) phase: SessionPhase,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_state(id, SessionState::default())
    }

    /// Resume a session from a state the caller persisted earlier
    pub fn with_state(id: impl Into<String>, state: SessionState) -> Self {
        Self {
            id: id.into(),
            state,
            transcript: Vec::new(),
            phase: SessionPhase::Active,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub(crate) fn record_user(&mut self, text: &str) {
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::User,
            text: text.to_string(),
            handler: None,
        });
    }

    pub(crate) fn record_assistant(&mut self, handler: &HandlerName, text: &str) {
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::Assistant,
            text: text.to_string(),
            handler: Some(handler.clone()),
        });
    }
}
