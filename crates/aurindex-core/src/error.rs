use thiserror::Error;

/// Validation and contract errors exposed by `aurindex-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' cannot be empty")]
    EmptyField { field: &'static str },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be positive")]
    NonPositiveValue { field: &'static str },
    #[error("confidence must be within [0, 1]: {value}")]
    ConfidenceOutOfRange { value: f64 },

    #[error("index weights cannot be empty")]
    EmptyWeights,
    #[error("index weights must sum to 1.0 within {tolerance}, got {sum}")]
    WeightSumMismatch { sum: f64, tolerance: f64 },
    #[error("base price for '{symbol}' must be positive, got {value}")]
    NonPositiveBasePrice { symbol: String, value: f64 },

    #[error("summary length {len} exceeds max {max}")]
    SummaryTooLong { len: usize, max: usize },
    #[error("invalid sentiment '{value}', expected one of positive, negative, neutral")]
    InvalidSentiment { value: String },
    #[error("invalid index method '{value}', expected level_normalized or return_based")]
    InvalidMethod { value: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
