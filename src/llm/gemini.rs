//! Google Gemini client using JSON structured output

use super::types::{MessageRole, ModelRequest, ModelResponse, Usage};
use super::{ModelClient, ModelError, ModelErrorKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const PUBLIC_API: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    url: String,
    model_id: String,
}

impl GeminiClient {
    /// `gateway` replaces the public API host, e.g. a local proxy that
    /// adds credentials itself.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        gateway: Option<&str>,
    ) -> Result<Self, ModelError> {
        let model_id = model.into();
        let url = match gateway {
            Some(gw) => format!(
                "{}/gemini/v1beta/models/{}:generateContent",
                gw.trim_end_matches('/'),
                model_id
            ),
            None => format!("{PUBLIC_API}/v1beta/models/{model_id}:generateContent"),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| {
                ModelError::new(
                    ModelErrorKind::Transport,
                    format!("Failed to create HTTP client: {e}"),
                )
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            url,
            model_id,
        })
    }

    fn translate_request(request: &ModelRequest) -> GeminiRequest {
        let system_instruction = (!request.system.is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: request.system.clone(),
            }],
        });

        // Gemini requires alternating roles, so consecutive messages from
        // the same speaker are folded into one content entry
        let mut contents: Vec<GeminiContent> = Vec::new();
        for msg in &request.messages {
            let role = match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };
            let part = GeminiPart {
                text: msg.text.clone(),
            };
            match contents.last_mut() {
                Some(last) if last.role.as_deref() == Some(role) => last.parts.push(part),
                _ => contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts: vec![part],
                }),
            }
        }

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
                response_mime_type: request
                    .response_schema
                    .as_ref()
                    .map(|_| "application/json".to_string()),
                response_schema: request.response_schema.clone(),
                thinking_config: Some(GeminiThinkingConfig { thinking_budget: 0 }),
            },
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<ModelResponse, ModelError> {
        let Some(candidate) = resp.candidates.into_iter().next() else {
            return Err(match resp.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => ModelError::new(
                    ModelErrorKind::Blocked,
                    format!("Prompt blocked: {reason}"),
                ),
                None => ModelError::new(ModelErrorKind::Malformed, "No candidates in response"),
            });
        };

        match candidate.finish_reason.as_deref() {
            None | Some("STOP" | "MAX_TOKENS") => {}
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII")) => {
                return Err(ModelError::new(
                    ModelErrorKind::Blocked,
                    format!("Generation stopped: {reason}"),
                ));
            }
            Some(reason) => tracing::warn!(finish_reason = %reason, "Gemini stopped early"),
        }

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        let usage = resp.usage_metadata.unwrap_or_default();
        Ok(ModelResponse {
            text,
            usage: Usage {
                input_tokens: u64::from(usage.prompt_token_count),
                output_tokens: u64::from(usage.candidates_token_count),
            },
        })
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("Request timeout: {e}")
                } else if e.is_connect() {
                    format!("Connection failed: {e}")
                } else {
                    format!("Request failed: {e}")
                };
                ModelError::new(ModelErrorKind::Transport, message)
            })?;

        let status = response.status();
        let retry_header = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.map_err(|e| {
            ModelError::new(ModelErrorKind::Transport, format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body, retry_header));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            ModelError::new(
                ModelErrorKind::Malformed,
                format!("Failed to parse response: {e} - body: {body}"),
            )
        })?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Build the error for a non-success response. Google's RPC status wins
/// over the HTTP code when present; `RetryInfo.retryDelay` wins over the
/// `Retry-After` header.
fn api_error(http_status: u16, body: &str, retry_header: Option<Duration>) -> ModelError {
    let parsed = serde_json::from_str::<GeminiErrorResponse>(body).ok();
    let (message, rpc_status, retry_delay) = match parsed {
        Some(GeminiErrorResponse { error }) => {
            let delay = error
                .details
                .iter()
                .filter_map(|d| d.retry_delay.as_deref())
                .find_map(parse_retry_delay);
            (error.message, error.status, delay)
        }
        None => (body.to_string(), None, None),
    };

    let kind = classify(http_status, rpc_status.as_deref());
    ModelError::new(kind, format!("HTTP {http_status}: {message}"))
        .with_retry_after(retry_delay.or(retry_header))
}

fn classify(http_status: u16, rpc_status: Option<&str>) -> ModelErrorKind {
    match rpc_status {
        Some("RESOURCE_EXHAUSTED") => return ModelErrorKind::Throttled,
        Some("UNAVAILABLE" | "DEADLINE_EXCEEDED" | "INTERNAL") => return ModelErrorKind::Unavailable,
        Some("UNAUTHENTICATED" | "PERMISSION_DENIED") => return ModelErrorKind::Credentials,
        Some("INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "NOT_FOUND") => {
            return ModelErrorKind::Rejected
        }
        _ => {}
    }
    match http_status {
        401 | 403 => ModelErrorKind::Credentials,
        408 => ModelErrorKind::Transport,
        429 => ModelErrorKind::Throttled,
        500..=599 => ModelErrorKind::Unavailable,
        _ => ModelErrorKind::Rejected,
    }
}

/// Google durations are decimal seconds with an `s` suffix, e.g. `"37s"`
/// or `"1.5s"`
fn parse_retry_delay(text: &str) -> Option<Duration> {
    let secs: f64 = text.trim().strip_suffix('s')?.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<GeminiThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiErrorDetail {
    retry_delay: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelMessage;
    use serde_json::json;

    #[test]
    fn test_gateway_url() {
        let client = GeminiClient::new("key", "gemini-2.5-flash", Some("http://localhost:8000/")).unwrap();
        assert_eq!(
            client.url,
            "http://localhost:8000/gemini/v1beta/models/gemini-2.5-flash:generateContent"
        );

        let client = GeminiClient::new("key", DEFAULT_MODEL, None).unwrap();
        assert!(client.url.starts_with(PUBLIC_API));
        assert_eq!(client.model_id(), DEFAULT_MODEL);
    }

    #[test]
    fn test_translate_request_merges_same_role_and_sets_schema() {
        let request = ModelRequest::new("You take food orders.")
            .with_message(ModelMessage::assistant("To go or for here?"))
            .with_message(ModelMessage::assistant("Also, hello"))
            .with_message(ModelMessage::user("to go"))
            .with_response_schema(json!({"type": "OBJECT"}));

        let body = serde_json::to_value(GeminiClient::translate_request(&request)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You take food orders.");
        assert_eq!(body["contents"].as_array().unwrap().len(), 2);
        assert_eq!(body["contents"][0]["role"], "model");
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 2);
        assert_eq!(body["contents"][1]["role"], "user");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
    }

    #[test]
    fn test_normalize_response() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": "1}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3, "totalTokenCount": 15}
        }))
        .unwrap();

        let response = GeminiClient::normalize_response(resp).unwrap();
        assert_eq!(response.text, "{\"a\":1}");
        assert_eq!(response.usage.total(), 15);
    }

    #[test]
    fn test_no_candidates_is_an_error() {
        let resp: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        let err = GeminiClient::normalize_response(resp).unwrap_err();
        assert_eq!(err.kind, ModelErrorKind::Malformed);

        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        let err = GeminiClient::normalize_response(resp).unwrap_err();
        assert_eq!(err.kind, ModelErrorKind::Blocked);
        assert!(!err.kind.is_retryable());
    }

    #[test]
    fn test_safety_stop_is_blocked() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
        }))
        .unwrap();
        let err = GeminiClient::normalize_response(resp).unwrap_err();
        assert_eq!(err.kind, ModelErrorKind::Blocked);
    }

    #[test]
    fn test_api_error_uses_rpc_status_and_retry_info() {
        let body = json!({
            "error": {
                "code": 429,
                "message": "Quota exceeded",
                "status": "RESOURCE_EXHAUSTED",
                "details": [
                    {"@type": "type.googleapis.com/google.rpc.QuotaFailure"},
                    {"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "37s"}
                ]
            }
        })
        .to_string();
        let err = api_error(429, &body, Some(Duration::from_secs(5)));
        assert_eq!(err.kind, ModelErrorKind::Throttled);
        assert_eq!(err.message, "HTTP 429: Quota exceeded");
        assert_eq!(err.retry_after, Some(Duration::from_secs(37)));

        // RPC status overrides a misleading HTTP code
        let body = json!({"error": {"code": 400, "message": "bad key", "status": "PERMISSION_DENIED"}})
            .to_string();
        assert_eq!(api_error(400, &body, None).kind, ModelErrorKind::Credentials);
    }

    #[test]
    fn test_api_error_falls_back_to_http_status() {
        let err = api_error(503, "upstream connect error", Some(Duration::from_secs(2)));
        assert_eq!(err.kind, ModelErrorKind::Unavailable);
        assert!(err.kind.is_retryable());
        assert_eq!(err.message, "HTTP 503: upstream connect error");
        assert_eq!(err.retry_after, Some(Duration::from_secs(2)));

        assert_eq!(classify(401, None), ModelErrorKind::Credentials);
        assert_eq!(classify(404, None), ModelErrorKind::Rejected);
        assert_eq!(classify(429, None), ModelErrorKind::Throttled);
    }

    #[test]
    fn test_parse_retry_delay() {
        assert_eq!(parse_retry_delay("37s"), Some(Duration::from_secs(37)));
        assert_eq!(parse_retry_delay("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_delay("37"), None);
        assert_eq!(parse_retry_delay("-1s"), None);
    }
}
