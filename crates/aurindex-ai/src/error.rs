//! Error types for insight generation.

use thiserror::Error;

/// Failures raised while generating or persisting an insight.
///
/// Insight generation is fire-and-forget: callers count these errors and move
/// on, they never retry or block an index computation on them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InsightError {
    /// The upstream model did not answer within the configured deadline.
    #[error("insight generation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The model answered, but the payload did not match the expected schema.
    #[error("invalid insight response: {reason}")]
    InvalidResponseSchema { reason: String },

    /// Transport or provider failure before a usable response was produced.
    #[error("upstream model error: {message}")]
    Upstream { message: String },
}

impl InsightError {
    pub fn invalid_schema(reason: impl Into<String>) -> Self {
        Self::InvalidResponseSchema {
            reason: reason.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "insight.timeout",
            Self::InvalidResponseSchema { .. } => "insight.invalid_schema",
            Self::Upstream { .. } => "insight.upstream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(InsightError::Timeout { timeout_ms: 30_000 }.code(), "insight.timeout");
        assert_eq!(InsightError::invalid_schema("missing summary").code(), "insight.invalid_schema");
        assert_eq!(InsightError::upstream("connection refused").code(), "insight.upstream");
    }

    #[test]
    fn test_display_includes_detail() {
        let err = InsightError::invalid_schema("summary exceeds 200 characters");
        assert_eq!(
            err.to_string(),
            "invalid insight response: summary exceeds 200 characters"
        );
    }
}
