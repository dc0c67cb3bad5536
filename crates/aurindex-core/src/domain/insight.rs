use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// Maximum accepted length of an insight summary, in characters.
pub const MAX_SUMMARY_LEN: usize = 200;

/// Per-symbol market read produced by the insight collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(ValidationError::InvalidSentiment {
                value: other.to_owned(),
            }),
        }
    }
}

impl Display for Sentiment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The price line behind one symbol of an insight request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub source: String,
    pub observed_at: UtcDateTime,
}

/// Everything the insight collaborator needs to narrate one computed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRequest {
    pub index_name: String,
    pub index_value: f64,
    pub delta_24h_pct: Option<f64>,
    pub timestamp: UtcDateTime,
    pub prices: IndexMap<Symbol, PricePoint>,
    pub weights: IndexMap<Symbol, f64>,
    pub base_level: f64,
    pub base_date: String,
}

/// Structured response from the insight collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResponse {
    pub summary: String,
    pub notable_events: Vec<String>,
    pub sentiment: IndexMap<Symbol, Sentiment>,
}

impl InsightResponse {
    pub fn new(
        summary: impl Into<String>,
        notable_events: Vec<String>,
        sentiment: IndexMap<Symbol, Sentiment>,
    ) -> Result<Self, ValidationError> {
        let summary = summary.into();
        if summary.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "summary" });
        }
        let len = summary.chars().count();
        if len > MAX_SUMMARY_LEN {
            return Err(ValidationError::SummaryTooLong {
                len,
                max: MAX_SUMMARY_LEN,
            });
        }

        Ok(Self {
            summary,
            notable_events,
            sentiment,
        })
    }
}
