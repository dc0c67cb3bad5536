//! Inbound price stream contract and wire parsing.
//!
//! Sources deliver opaque message bytes; [`parse_price_message`] turns one
//! message into a fully validated [`PriceObservation`]. Delivery is
//! at-least-once with no cross-symbol ordering, so a malformed message is
//! dropped and counted by the caller, never retried.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::{PriceObservation, Symbol, UtcDateTime};

/// Why an inbound message could not become a [`PriceObservation`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("malformed price message: {reason}")]
    Malformed { reason: String },
}

impl TransportError {
    fn malformed(reason: impl Display) -> Self {
        Self::Malformed {
            reason: reason.to_string(),
        }
    }
}

/// Wire shape of one inbound message. Field names are the stable contract;
/// `confidence` defaults to full trust when a producer omits it.
#[derive(Debug, Deserialize)]
struct RawPriceMessage {
    symbol: String,
    price: f64,
    unit: String,
    observed_at: String,
    source: String,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Parse and validate one raw message.
///
/// Every content rule is enforced here so the cache and calculator never see
/// an unchecked observation: symbol shape, UTC timestamp, positive price,
/// non-empty unit/source, confidence within [0, 1].
pub fn parse_price_message(bytes: &[u8]) -> Result<PriceObservation, TransportError> {
    let raw: RawPriceMessage =
        serde_json::from_slice(bytes).map_err(TransportError::malformed)?;

    let symbol = Symbol::parse(&raw.symbol).map_err(TransportError::malformed)?;
    let observed_at = UtcDateTime::parse(&raw.observed_at).map_err(TransportError::malformed)?;

    PriceObservation::new(
        symbol,
        raw.price,
        raw.unit,
        observed_at,
        raw.source,
        raw.source_id,
        raw.confidence.unwrap_or(1.0),
    )
    .map_err(TransportError::malformed)
}

/// Inbound stream contract.
///
/// `recv` yields the next raw message, or `None` once the source is closed
/// and drained. Sources own their transport errors; only end-of-stream is
/// visible to the consumer loop.
pub trait PriceSource: Send {
    /// Human-readable source label used in logs.
    fn name(&self) -> &str;

    /// Next raw message, or `None` when the stream has ended.
    fn recv<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + 'a>>;
}

/// In-process source backed by a bounded channel.
///
/// The service's socket listeners feed it from accepted connections; tests
/// and the replay path feed it directly.
#[derive(Debug)]
pub struct ChannelSource {
    name: String,
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl ChannelSource {
    pub fn new(name: impl Into<String>, receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            receiver,
        }
    }

    /// Bounded sender/source pair for in-process producers.
    pub fn pair(name: impl Into<String>, capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self::new(name, receiver))
    }
}

impl PriceSource for ChannelSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn recv<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + 'a>> {
        Box::pin(self.receiver.recv())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_message() {
        let message = br#"{
            "symbol": "gold",
            "price": 1900.12,
            "unit": "USD/oz",
            "observed_at": "2026-01-15T10:00:00Z",
            "source": "metals-feed",
            "source_id": "tick-8812",
            "confidence": 0.97
        }"#;

        let observation = parse_price_message(message).expect("valid message");
        assert_eq!(observation.symbol.as_str(), "GOLD");
        assert_eq!(observation.price, 1900.12);
        assert_eq!(observation.confidence, 0.97);
        assert_eq!(observation.source_id.as_deref(), Some("tick-8812"));
    }

    #[test]
    fn defaults_missing_confidence_to_full_trust() {
        let message = br#"{
            "symbol": "BTC",
            "price": 27450.0,
            "unit": "USD",
            "observed_at": "2026-01-15T10:00:00Z",
            "source": "crypto-feed"
        }"#;

        let observation = parse_price_message(message).expect("valid message");
        assert_eq!(observation.confidence, 1.0);
    }

    #[test]
    fn rejects_invalid_json() {
        let err = parse_price_message(b"{not json").expect_err("must fail");
        assert!(matches!(err, TransportError::Malformed { .. }));
    }

    #[test]
    fn rejects_non_positive_price() {
        let message = br#"{
            "symbol": "OIL",
            "price": -5.0,
            "unit": "USD/bbl",
            "observed_at": "2026-01-15T10:00:00Z",
            "source": "energy-feed"
        }"#;

        let err = parse_price_message(message).expect_err("must fail");
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let message = br#"{
            "symbol": "OIL",
            "price": 78.45,
            "unit": "USD/bbl",
            "observed_at": "2026-01-15T10:00:00+02:00",
            "source": "energy-feed"
        }"#;

        let err = parse_price_message(message).expect_err("must fail");
        assert!(matches!(err, TransportError::Malformed { .. }));
    }

    #[tokio::test]
    async fn channel_source_yields_messages_then_end_of_stream() {
        let (sender, mut source) = ChannelSource::pair("test", 8);
        sender.send(b"one".to_vec()).await.expect("send");
        sender.send(b"two".to_vec()).await.expect("send");
        drop(sender);

        assert_eq!(source.recv().await, Some(b"one".to_vec()));
        assert_eq!(source.recv().await, Some(b"two".to_vec()));
        assert_eq!(source.recv().await, None);
        assert_eq!(source.name(), "test");
    }
}
