//! Model capability used by the built-in handlers
//!
//! Handlers see the model only through [`ModelClient`]: a request carrying
//! a system prompt, the conversation so far and an optional JSON schema
//! for structured output, answered with the model's text.

mod error;
mod gemini;
mod registry;
mod types;

pub use error::{ModelError, ModelErrorKind};
pub use gemini::{GeminiClient, DEFAULT_MODEL};
pub use registry::{ModelConfig, ModelRegistry};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for model providers
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for Arc<T> {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for model clients
pub struct LoggingModel {
    inner: Arc<dyn ModelClient>,
    model_id: String,
}

impl LoggingModel {
    pub fn new(inner: Arc<dyn ModelClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl ModelClient for LoggingModel {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Model request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    kind = %e.kind,
                    error = %e.message,
                    retry_after_ms = ?e.retry_after.map(|d| d.as_millis()),
                    retryable = e.kind.is_retryable(),
                    "Model request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
