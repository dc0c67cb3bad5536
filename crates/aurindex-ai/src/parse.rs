//! Parsing and validation of raw model output.
//!
//! Model replies are JSON, but rarely only JSON: providers wrap the object in
//! markdown fences or lead with a sentence of prose. Extraction strips an
//! outer ``` fence if present and then takes the widest `{` .. `}` window
//! before handing the slice to serde. Validation happens after parsing: every
//! sentiment must be one of the three known values and the summary must fit
//! the response contract.

use std::sync::OnceLock;

use aurindex_core::domain::{InsightResponse, Sentiment, Symbol};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::error::InsightError;

/// Raw wire shape of a model reply.
///
/// The prompt also asks the model to echo `index` and `index_delta_24h_pct`.
/// Those are not part of the response contract, so serde drops them here
/// along with any other extra keys.
#[derive(Debug, Deserialize)]
struct RawInsight {
    summary: String,
    notable_events: Vec<String>,
    sentiment: IndexMap<String, String>,
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^\s*```(?:json)?\s*(.+?)\s*```\s*$").expect("fence pattern must compile")
    })
}

fn extract_json_object(text: &str) -> Result<&str, InsightError> {
    let text = match fence_pattern().captures(text) {
        Some(captures) => captures.get(1).map_or(text, |inner| inner.as_str()),
        None => text,
    };

    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(InsightError::invalid_schema(
            "no JSON object found in model output",
        )),
    }
}

/// Parse one model reply into a validated [`InsightResponse`].
pub fn parse_insight_response(text: &str) -> Result<InsightResponse, InsightError> {
    let window = extract_json_object(text)?;
    let raw: RawInsight = serde_json::from_str(window)
        .map_err(|err| InsightError::invalid_schema(err.to_string()))?;

    let mut sentiment = IndexMap::with_capacity(raw.sentiment.len());
    for (symbol, value) in raw.sentiment {
        let symbol = Symbol::parse(&symbol).map_err(|err| {
            InsightError::invalid_schema(format!("invalid sentiment symbol '{symbol}': {err}"))
        })?;
        let value = Sentiment::parse(&value).map_err(|_| {
            InsightError::invalid_schema(format!("invalid sentiment '{value}' for {symbol}"))
        })?;
        sentiment.insert(symbol, value);
    }

    InsightResponse::new(raw.summary, raw.notable_events, sentiment)
        .map_err(|err| InsightError::invalid_schema(err.to_string()))
}
