use thiserror::Error;

/// Longest body excerpt carried in an error message.
pub const SNIPPET_CHARS: usize = 200;

/// Why an attempt was worth retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// Endpoint answered 503 while the model cold-starts.
    Loading,
    /// The attempt ran past its per-attempt timeout.
    Timeout,
    /// Connection refused, DNS failure and the like.
    Network(String),
}

impl RetryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Timeout => "timeout",
            Self::Network(_) => "network",
        }
    }
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "model still loading"),
            Self::Timeout => write!(f, "attempt timed out"),
            Self::Network(detail) => write!(f, "network error: {detail}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("input too short: {chars} characters, need at least {min}")]
    InvalidInput { chars: usize, min: usize },
    #[error("model not found at {model_id}; check the repo path and visibility")]
    ModelNotFound { model_id: String },
    #[error("inference returned an unusable response: {snippet}")]
    MalformedResponse { snippet: String },
    #[error("inference did not complete after {attempts} attempts ({last_reason})")]
    TransientUnavailable {
        attempts: u32,
        last_reason: RetryReason,
    },
    #[error("endpoint returned {status}: {snippet}")]
    TransportError { status: u16, snippet: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClassifyError {
    /// Short stable name used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::ModelNotFound { .. } => "model_not_found",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::TransientUnavailable { .. } => "transient_unavailable",
            Self::TransportError { .. } => "transport_error",
            Self::Config(_) => "config",
        }
    }
}

/// First [`SNIPPET_CHARS`] characters of `body`, never splitting a character.
pub fn snippet(body: &str) -> String {
    match body.char_indices().nth(SNIPPET_CHARS) {
        Some((end, _)) => body[..end].to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_keeps_short_bodies() {
        assert_eq!(snippet("oops"), "oops");
        assert_eq!(snippet(""), "");
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let body = "é".repeat(SNIPPET_CHARS + 10);
        let cut = snippet(&body);
        assert_eq!(cut.chars().count(), SNIPPET_CHARS);
        assert!(body.starts_with(&cut));
    }

    #[test]
    fn error_messages_carry_detail() {
        let err = ClassifyError::TransportError {
            status: 500,
            snippet: "boom".into(),
        };
        assert_eq!(err.to_string(), "endpoint returned 500: boom");

        let err = ClassifyError::TransientUnavailable {
            attempts: 2,
            last_reason: RetryReason::Loading,
        };
        assert!(err.to_string().contains("2 attempts"));
        assert_eq!(err.kind(), "transient_unavailable");
    }
}
