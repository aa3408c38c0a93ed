//! Conversation handlers and the name-keyed registry
//!
//! A handler is stateless. It reads the session state and the pending user
//! input and returns an utterance plus a [`StateDelta`]; the engine decides
//! whether to commit that delta.

use crate::llm::ModelError;
use crate::router::HandlerName;
use crate::session::{SessionState, StateDelta, TranscriptEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// What a handler gets to see for one invocation
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub state: &'a SessionState,
    /// `None` for internal hand-offs, which run without new user input
    pub input: Option<&'a str>,
    /// Conversation so far, including `input` when present
    pub transcript: &'a [TranscriptEntry],
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        state: &'a SessionState,
        input: Option<&'a str>,
        transcript: &'a [TranscriptEntry],
    ) -> Self {
        Self {
            state,
            input,
            transcript,
        }
    }
}

/// Handler result: an assistant utterance and the changes to commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOutput {
    /// May be empty; empty responses are not shown to the user
    pub response: String,
    pub delta: StateDelta,
}

impl HandlerOutput {
    pub fn new(response: impl Into<String>, delta: StateDelta) -> Self {
        Self {
            response: response.into(),
            delta,
        }
    }

    pub fn say(response: impl Into<String>) -> Self {
        Self::new(response, StateDelta::default())
    }

    pub fn silent(delta: StateDelta) -> Self {
        Self::new(String::new(), delta)
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The capability answered, but not in the shape the handler expects
    #[error("invalid handler output: {0}")]
    Validation(String),
    #[error("model call failed: {0}")]
    Capability(#[from] ModelError),
}

#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> HandlerName;

    async fn run(&self, ctx: &HandlerContext<'_>) -> Result<HandlerOutput, HandlerError>;
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
    fn name(&self) -> HandlerName {
        (**self).name()
    }

    async fn run(&self, ctx: &HandlerContext<'_>) -> Result<HandlerOutput, HandlerError> {
        (**self).run(ctx).await
    }
}

/// Handlers keyed by name
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerName, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under its own name, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn Handler>) -> Option<Arc<dyn Handler>> {
        let name = handler.name();
        let previous = self.handlers.insert(name.clone(), handler);
        if previous.is_some() {
            tracing::warn!(handler = %name, "Replacing registered handler");
        }
        previous
    }

    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, name: &HandlerName) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &HandlerName) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<HandlerName> {
        let mut names: Vec<_> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
