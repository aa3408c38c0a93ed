//! Model call failures

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A failed model call. The engine never retries; callers use
/// [`ModelErrorKind::is_retryable`] and `retry_after` to decide.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
    /// Server-suggested wait before trying again
    pub retry_after: Option<Duration>,
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// Connection, timeout or body read failure
    Transport,
    /// Quota or rate limit hit
    Throttled,
    /// Provider overloaded or failing
    Unavailable,
    /// Missing, invalid or unauthorized API key
    Credentials,
    /// The provider refused the request as sent
    Rejected,
    /// Generation stopped by a safety or recitation filter
    Blocked,
    /// A response arrived but could not be used
    Malformed,
}

impl ModelErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transport | Self::Throttled | Self::Unavailable)
    }
}

impl fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transport => "transport error",
            Self::Throttled => "throttled",
            Self::Unavailable => "model unavailable",
            Self::Credentials => "credentials rejected",
            Self::Rejected => "request rejected",
            Self::Blocked => "response blocked",
            Self::Malformed => "malformed response",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_kinds_are_retryable() {
        let retryable: Vec<_> = [
            ModelErrorKind::Transport,
            ModelErrorKind::Throttled,
            ModelErrorKind::Unavailable,
            ModelErrorKind::Credentials,
            ModelErrorKind::Rejected,
            ModelErrorKind::Blocked,
            ModelErrorKind::Malformed,
        ]
        .into_iter()
        .filter(|kind| kind.is_retryable())
        .collect();
        assert_eq!(
            retryable,
            [
                ModelErrorKind::Transport,
                ModelErrorKind::Throttled,
                ModelErrorKind::Unavailable
            ]
        );
    }

    #[test]
    fn test_display_leads_with_kind() {
        let err = ModelError::new(ModelErrorKind::Throttled, "quota exhausted")
            .with_retry_after(Some(Duration::from_secs(7)));
        assert_eq!(err.to_string(), "throttled: quota exhausted");
        assert_eq!(err.retry_after, Some(Duration::from_secs(7)));
    }
}
