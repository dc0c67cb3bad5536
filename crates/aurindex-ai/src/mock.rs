//! Deterministic in-process model for tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aurindex_core::domain::{InsightRequest, InsightResponse, Sentiment, MAX_SUMMARY_LEN};
use indexmap::IndexMap;

use crate::error::InsightError;
use crate::model::InsightModel;

/// 24h move, in percent, above which the mock emits a notable event.
const NOTABLE_MOVE_PCT: f64 = 5.0;

/// [`InsightModel`] that derives its answer from the request alone.
///
/// The output is a pure function of the input, which makes pipeline tests
/// assertable. Failure and latency can be injected to exercise the
/// fire-and-forget paths.
#[derive(Default)]
pub struct MockInsightModel {
    delay: Option<Duration>,
    fail_with: Option<InsightError>,
    calls: Arc<AtomicUsize>,
}

impl MockInsightModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer every call with `error` instead of a response.
    pub fn failing_with(mut self, error: InsightError) -> Self {
        self.fail_with = Some(error);
        self
    }

    /// Number of `generate` calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl InsightModel for MockInsightModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &InsightRequest) -> Result<InsightResponse, InsightError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }

        let summary = match request.delta_24h_pct {
            Some(delta) => format!(
                "{} at {:.2} ({delta:+.2}% over 24h).",
                request.index_name, request.index_value
            ),
            None => format!(
                "{} at {:.2}; 24h change unavailable.",
                request.index_name, request.index_value
            ),
        };
        let summary: String = summary.chars().take(MAX_SUMMARY_LEN).collect();

        let mut notable_events = Vec::new();
        if let Some(delta) = request.delta_24h_pct {
            if delta.abs() >= NOTABLE_MOVE_PCT {
                notable_events.push(format!(
                    "{} moved {delta:.2}% over 24h",
                    request.index_name
                ));
            }
        }

        let tone = match request.delta_24h_pct {
            Some(delta) if delta > 1.0 => Sentiment::Positive,
            Some(delta) if delta < -1.0 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        };
        let mut sentiment = IndexMap::with_capacity(request.weights.len());
        for symbol in request.weights.keys() {
            sentiment.insert(symbol.clone(), tone);
        }

        Ok(InsightResponse {
            summary,
            notable_events,
            sentiment,
        })
    }
}
