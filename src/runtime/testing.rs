//! Mock implementations for testing
//!
//! These let the engine, the built-in handlers and the runtime be tested
//! without a real model behind them.

use crate::handler::{Handler, HandlerContext, HandlerError, HandlerOutput};
use crate::llm::{ModelClient, ModelError, ModelErrorKind, ModelRequest, ModelResponse};
use crate::router::HandlerName;
use crate::session::{SessionState, TranscriptEntry};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Model Client
// ============================================================================

/// Model client that returns queued responses
pub struct MockModelClient {
    responses: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl MockModelClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: ModelResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a successful response carrying `text`
    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue_response(ModelResponse::text(text));
    }

    /// Queue a response whose text is the serialized `value`
    pub fn queue_json(&self, value: serde_json::Value) {
        self.queue_text(value.to_string());
    }

    /// Queue an error response
    pub fn queue_error(&self, error: ModelError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::new(ModelErrorKind::Transport, "No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Scripted Handler
// ============================================================================

/// What a [`ScriptedHandler`] was called with
#[derive(Debug, Clone)]
pub struct HandlerCall {
    pub state: SessionState,
    pub input: Option<String>,
    pub transcript: Vec<TranscriptEntry>,
}

/// Handler that replays queued outputs and records its calls.
///
/// With nothing queued it answers with an empty output, which leaves the
/// state alone.
pub struct ScriptedHandler {
    name: HandlerName,
    outputs: Mutex<VecDeque<Result<HandlerOutput, HandlerError>>>,
    calls: Mutex<Vec<HandlerCall>>,
    delay: Option<Duration>,
    /// Notified when a call starts (for test synchronization)
    pub call_started: Arc<Notify>,
}

impl ScriptedHandler {
    pub fn new(name: HandlerName) -> Self {
        Self {
            name,
            outputs: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            call_started: Arc::new(Notify::new()),
        }
    }

    /// Sleep for `delay` before answering (for cancellation testing)
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue(&self, output: HandlerOutput) {
        self.outputs.lock().unwrap().push_back(Ok(output));
    }

    pub fn queue_error(&self, error: HandlerError) {
        self.outputs.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Handler for ScriptedHandler {
    fn name(&self) -> HandlerName {
        self.name.clone()
    }

    async fn run(&self, ctx: &HandlerContext<'_>) -> Result<HandlerOutput, HandlerError> {
        self.calls.lock().unwrap().push(HandlerCall {
            state: ctx.state.clone(),
            input: ctx.input.map(str::to_string),
            transcript: ctx.transcript.to_vec(),
        });
        self.call_started.notify_waiters();

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HandlerOutput::default()))
    }
}
