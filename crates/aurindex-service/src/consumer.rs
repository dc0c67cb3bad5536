//! The streaming consumer: one inbound price message drives one computation
//! pass over every configured index.
//!
//! Each pass is isolated per index. A validation failure, store error, or
//! rejected result for one index is logged and counted, and the loop moves on
//! to the next index; nothing short of shutdown stops the stream. Insight
//! generation happens after the value is persisted and never blocks the pass.

use std::collections::HashMap;
use std::sync::Arc;

use aurindex_ai::InsightDispatcher;
use aurindex_core::cache::PriceCache;
use aurindex_core::calculator::{IndexCalculator, ValidationFailure};
use aurindex_core::domain::{
    AuditPayload, IndexConfig, IndexMethod, IndexResult, InsightRequest, PriceObservation,
    PricePoint, Symbol, UtcDateTime,
};
use aurindex_core::store::{IndexStore, StoreError};
use aurindex_core::transport::{parse_price_message, PriceSource};
use aurindex_core::ValidationError;
use indexmap::IndexMap;
use thiserror::Error;

use crate::metrics::PipelineMetrics;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Failures surfaced by the on-demand computation path. The streaming loop
/// never returns these; it logs and continues.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("unknown index '{0}'")]
    UnknownIndex(String),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("no stored history for index '{0}'")]
    NoHistory(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("computed result was rejected: {0}")]
    InvalidResult(#[from] ValidationError),
}

struct IndexEntry {
    config: IndexConfig,
    calculator: IndexCalculator,
}

/// Streaming index pipeline over one price cache and one store.
pub struct IndexConsumer {
    cache: PriceCache,
    store: Arc<dyn IndexStore>,
    dispatcher: Option<Arc<InsightDispatcher>>,
    metrics: Arc<PipelineMetrics>,
    indices: Vec<IndexEntry>,
}

impl IndexConsumer {
    /// Build a consumer for the given index definitions. Calculators are
    /// constructed up front, so an invalid definition fails here instead of
    /// inside the stream loop.
    pub fn new(
        store: Arc<dyn IndexStore>,
        indices: Vec<IndexConfig>,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self, ValidationError> {
        let mut entries = Vec::with_capacity(indices.len());
        for config in indices {
            let calculator = IndexCalculator::new(&config)?;
            entries.push(IndexEntry { config, calculator });
        }
        Ok(Self {
            cache: PriceCache::new(),
            store,
            dispatcher: None,
            metrics,
            indices: entries,
        })
    }

    /// Attach a dispatcher; each persisted result is then submitted for
    /// insight generation.
    pub fn with_dispatcher(mut self, dispatcher: Arc<InsightDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indices
            .iter()
            .map(|entry| entry.config.name.clone())
            .collect()
    }

    /// Consume the source until it closes or shutdown flips. A message being
    /// processed when shutdown arrives finishes its full pass first.
    pub async fn run<S: PriceSource>(&self, mut source: S, mut shutdown: watch::Receiver<bool>) {
        info!(
            source = source.name(),
            indices = self.indices.len(),
            "consumer started"
        );
        loop {
            tokio::select! {
                frame = source.recv() => {
                    match frame {
                        Some(payload) => self.handle_frame(&payload).await,
                        None => {
                            info!("price source closed");
                            break;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("shutdown requested, stopping intake");
                        break;
                    }
                }
            }
        }
    }

    /// Process one raw frame: parse, update the cache, recompute every index.
    pub async fn handle_frame(&self, payload: &[u8]) {
        self.metrics.record_message();
        let observation = match parse_price_message(payload) {
            Ok(observation) => observation,
            Err(err) => {
                self.metrics.record_malformed();
                warn!(error = %err, "dropping malformed price message");
                return;
            }
        };

        let cycle = Uuid::new_v4();
        let symbol = observation.symbol.clone();
        if !self.cache.update(observation).await {
            self.metrics.record_stale_observation();
            debug!(%cycle, %symbol, "older observation ignored, recomputing anyway");
        }

        self.run_cycle(cycle).await;
        self.metrics.record_cycle();
    }

    /// One full pass over all configured indices.
    pub async fn run_cycle(&self, cycle: Uuid) {
        for entry in &self.indices {
            self.process_index(cycle, entry).await;
        }
    }

    async fn process_index(&self, cycle: Uuid, entry: &IndexEntry) {
        let config = &entry.config;
        let observations = self.cache.snapshot_observations(config.symbols()).await;
        let prices = price_view(&observations);

        if let Err(failure) = entry.calculator.validate(&prices) {
            self.metrics.record_validation_skip(&config.name);
            warn!(%cycle, index = %config.name, reason = %failure, "skipping index computation");
            return;
        }

        let value = entry.calculator.compute_level_normalized(&prices);
        let timestamp = UtcDateTime::now();
        let delta = match self.store.get_index_delta_24h(&config.name).await {
            Ok(delta) => delta,
            Err(err) => {
                warn!(
                    %cycle,
                    index = %config.name,
                    code = err.code(),
                    "delta lookup failed, continuing without delta: {err}"
                );
                None
            }
        };

        let result = match IndexResult::new(
            config.name.clone(),
            value,
            timestamp,
            IndexMethod::LevelNormalized,
            delta,
            audit_payload(config, &prices),
        ) {
            Ok(result) => result,
            Err(err) => {
                warn!(%cycle, index = %config.name, "computed result rejected: {err}");
                return;
            }
        };

        if let Err(err) = self.store.store_index_value(result.clone()).await {
            self.metrics.record_persist_failure();
            warn!(
                %cycle,
                index = %config.name,
                code = err.code(),
                "failed to persist index value: {err}"
            );
            return;
        }
        self.metrics.record_result_stored();
        info!(
            %cycle,
            index = %config.name,
            value,
            delta = ?delta,
            "index computed"
        );

        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.submit(insight_request(config, &observations, &result));
        }
    }

    /// Compute one index now, outside the stream loop, and persist the
    /// result. This is the only path that can use
    /// [`IndexMethod::ReturnBased`], which chains from the most recent stored
    /// value and its audit prices.
    pub async fn compute_once(
        &self,
        index_name: &str,
        method: IndexMethod,
    ) -> Result<IndexResult, ComputeError> {
        let entry = self
            .indices
            .iter()
            .find(|entry| entry.config.name == index_name)
            .ok_or_else(|| ComputeError::UnknownIndex(index_name.to_string()))?;
        let config = &entry.config;

        let observations = self.cache.snapshot_observations(config.symbols()).await;
        let prices = price_view(&observations);
        entry.calculator.validate(&prices)?;

        let value = match method {
            IndexMethod::LevelNormalized => entry.calculator.compute_level_normalized(&prices),
            IndexMethod::ReturnBased => {
                let previous = self
                    .store
                    .get_latest_index(index_name)
                    .await?
                    .ok_or_else(|| ComputeError::NoHistory(index_name.to_string()))?;
                let previous_prices: HashMap<Symbol, f64> = previous
                    .payload
                    .prices
                    .iter()
                    .map(|(symbol, &price)| (symbol.clone(), price))
                    .collect();
                entry
                    .calculator
                    .compute_return_index(&previous_prices, &prices, previous.index_value)
            }
        };

        let timestamp = UtcDateTime::now();
        let delta = self.store.get_index_delta_24h(index_name).await?;
        let result = IndexResult::new(
            config.name.clone(),
            value,
            timestamp,
            method,
            delta,
            audit_payload(config, &prices),
        )?;
        self.store.store_index_value(result.clone()).await?;
        self.metrics.record_result_stored();
        info!(index = %config.name, value, method = %method, "on-demand index computed");
        Ok(result)
    }
}

fn price_view(observations: &HashMap<Symbol, PriceObservation>) -> HashMap<Symbol, f64> {
    observations
        .iter()
        .map(|(symbol, observation)| (symbol.clone(), observation.price))
        .collect()
}

fn audit_payload(config: &IndexConfig, prices: &HashMap<Symbol, f64>) -> AuditPayload {
    let mut ordered = IndexMap::with_capacity(prices.len());
    for symbol in config.symbols() {
        if let Some(&price) = prices.get(symbol) {
            ordered.insert(symbol.clone(), price);
        }
    }
    AuditPayload {
        prices: ordered,
        weights: config.weights.clone(),
        base_prices: config.base_prices.clone(),
    }
}

fn insight_request(
    config: &IndexConfig,
    observations: &HashMap<Symbol, PriceObservation>,
    result: &IndexResult,
) -> InsightRequest {
    let mut prices = IndexMap::with_capacity(observations.len());
    for symbol in config.symbols() {
        if let Some(observation) = observations.get(symbol) {
            prices.insert(
                symbol.clone(),
                PricePoint {
                    price: observation.price,
                    source: observation.source.clone(),
                    observed_at: observation.observed_at,
                },
            );
        }
    }
    InsightRequest {
        index_name: config.name.clone(),
        index_value: result.index_value,
        delta_24h_pct: result.delta_24h_pct,
        timestamp: result.timestamp,
        prices,
        weights: config.weights.clone(),
        base_level: config.base_level,
        base_date: config.base_date.clone(),
    }
}

#[cfg(test)]
mod tests {
    use aurindex_ai::MockInsightModel;
    use aurindex_core::store::MemoryStore;

    use crate::metrics::PipelineMetrics;

    use super::*;

    fn consumer_with(
        store: Arc<MemoryStore>,
        indices: Vec<IndexConfig>,
    ) -> (IndexConsumer, Arc<PipelineMetrics>) {
        let metrics = Arc::new(PipelineMetrics::new());
        let consumer = IndexConsumer::new(
            store as Arc<dyn IndexStore>,
            indices,
            Arc::clone(&metrics),
        )
        .expect("indices must be valid");
        (consumer, metrics)
    }

    fn price_message(symbol: &str, price: f64, observed_at: &str) -> Vec<u8> {
        serde_json::json!({
            "symbol": symbol,
            "price": price,
            "unit": "USD",
            "observed_at": observed_at,
            "source": "test-feed"
        })
        .to_string()
        .into_bytes()
    }

    fn single_symbol_index(name: &str, symbol: &str, base_price: f64) -> IndexConfig {
        let symbol = Symbol::parse(symbol).unwrap();
        IndexConfig::new(
            name,
            1000.0,
            IndexMap::from([(symbol.clone(), 1.0)]),
            IndexMap::from([(symbol, base_price)]),
            "2024-01-01",
        )
        .expect("index must be valid")
    }

    #[tokio::test]
    async fn test_full_feed_computes_the_expected_level() {
        let store = Arc::new(MemoryStore::new());
        let (consumer, metrics) = consumer_with(
            Arc::clone(&store),
            vec![IndexConfig::default_commodity_crypto()],
        );

        let feed = [
            ("GOLD", 1900.12),
            ("SILVER", 24.31),
            ("OIL", 78.45),
            ("BTC", 27450.0),
            ("ETH", 1850.0),
        ];
        for (symbol, price) in feed {
            consumer
                .handle_frame(&price_message(symbol, price, "2026-08-20T10:00:00Z"))
                .await;
        }

        let latest = store
            .get_latest_index("GSOC")
            .await
            .expect("read must succeed")
            .expect("index must be stored");
        assert_eq!(latest.index_value, 1220.72);
        assert_eq!(latest.method, IndexMethod::LevelNormalized);
        assert_eq!(latest.delta_24h_pct, None);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_received, 5);
        assert_eq!(snapshot.cycles_completed, 5);
        // The first four passes are missing at least one symbol.
        assert_eq!(metrics.validation_skips_for("GSOC"), 4);
        assert_eq!(snapshot.results_stored, 1);
    }

    #[tokio::test]
    async fn test_malformed_message_is_dropped_without_a_cycle() {
        let store = Arc::new(MemoryStore::new());
        let (consumer, metrics) = consumer_with(
            Arc::clone(&store),
            vec![IndexConfig::default_commodity_crypto()],
        );

        consumer.handle_frame(b"not json at all").await;
        consumer
            .handle_frame(br#"{"symbol": "GOLD", "price": -5.0, "unit": "USD", "observed_at": "2026-08-20T10:00:00Z", "source": "t"}"#)
            .await;

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_received, 2);
        assert_eq!(snapshot.messages_malformed, 2);
        assert_eq!(snapshot.cycles_completed, 0);
        assert_eq!(store.value_count().await, 0);
    }

    #[tokio::test]
    async fn test_one_failing_index_does_not_stop_the_others() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes_for("ALPHA").await;
        let (consumer, metrics) = consumer_with(
            Arc::clone(&store),
            vec![
                single_symbol_index("ALPHA", "GOLD", 1800.0),
                single_symbol_index("BETA", "SILVER", 23.0),
            ],
        );

        consumer
            .handle_frame(&price_message("GOLD", 1900.0, "2026-08-20T10:00:00Z"))
            .await;
        consumer
            .handle_frame(&price_message("SILVER", 24.0, "2026-08-20T10:00:01Z"))
            .await;

        assert!(store
            .get_latest_index("ALPHA")
            .await
            .expect("read must succeed")
            .is_none());
        let beta = store
            .get_latest_index("BETA")
            .await
            .expect("read must succeed")
            .expect("BETA must be stored");
        assert_eq!(beta.index_value, 1043.48);

        let snapshot = metrics.snapshot();
        // ALPHA fails its persist on both cycles.
        assert_eq!(snapshot.persist_failures, 2);
        assert_eq!(snapshot.results_stored, 1);
    }

    #[tokio::test]
    async fn test_older_observation_does_not_shift_the_level() {
        let store = Arc::new(MemoryStore::new());
        let (consumer, metrics) = consumer_with(
            Arc::clone(&store),
            vec![single_symbol_index("ALPHA", "GOLD", 1800.0)],
        );

        consumer
            .handle_frame(&price_message("GOLD", 2000.0, "2026-08-20T12:00:00Z"))
            .await;
        consumer
            .handle_frame(&price_message("GOLD", 1.0, "2026-08-20T09:00:00Z"))
            .await;

        let latest = store
            .get_latest_index("ALPHA")
            .await
            .expect("read must succeed")
            .expect("index must be stored");
        assert_eq!(latest.index_value, 1111.11);
        assert_eq!(metrics.snapshot().stale_observations, 1);
    }

    #[tokio::test]
    async fn test_return_based_chains_from_the_stored_result() {
        let store = Arc::new(MemoryStore::new());
        let basket = IndexConfig::default_commodity_crypto();
        let (consumer, _metrics) = consumer_with(Arc::clone(&store), vec![basket.clone()]);

        // Previous value: the basket at its base prices and base level.
        let previous = IndexResult::new(
            "GSOC",
            1000.0,
            UtcDateTime::parse("2026-08-20T10:00:00Z").unwrap(),
            IndexMethod::LevelNormalized,
            None,
            AuditPayload {
                prices: basket.base_prices.clone(),
                weights: basket.weights.clone(),
                base_prices: basket.base_prices.clone(),
            },
        )
        .expect("previous result must be valid");
        store
            .store_index_value(previous)
            .await
            .expect("seed must store");

        let now = UtcDateTime::now();
        for (symbol, price) in [
            ("GOLD", 1900.12),
            ("SILVER", 24.31),
            ("OIL", 78.45),
            ("BTC", 27450.0),
            ("ETH", 1850.0),
        ] {
            let observation = PriceObservation::new(
                Symbol::parse(symbol).unwrap(),
                price,
                "USD",
                now,
                "test-feed",
                None,
                1.0,
            )
            .expect("observation must be valid");
            consumer.cache().update(observation).await;
        }

        let result = consumer
            .compute_once("GSOC", IndexMethod::ReturnBased)
            .await
            .expect("return computation must succeed");
        assert_eq!(result.index_value, 1220.7197);
        assert_eq!(result.method, IndexMethod::ReturnBased);

        let latest = store
            .get_latest_index("GSOC")
            .await
            .expect("read must succeed")
            .expect("must be stored");
        assert_eq!(latest.index_value, 1220.7197);
    }

    #[tokio::test]
    async fn test_compute_once_rejects_unknown_index() {
        let store = Arc::new(MemoryStore::new());
        let (consumer, _metrics) = consumer_with(
            Arc::clone(&store),
            vec![IndexConfig::default_commodity_crypto()],
        );

        let err = consumer
            .compute_once("NOPE", IndexMethod::LevelNormalized)
            .await
            .expect_err("must fail");
        assert!(matches!(err, ComputeError::UnknownIndex(ref name) if name == "NOPE"));
    }

    #[tokio::test]
    async fn test_persisted_result_feeds_the_insight_dispatcher() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(InsightDispatcher::new(
            Arc::new(MockInsightModel::new()),
            Arc::clone(&store) as Arc<dyn IndexStore>,
            1,
            8,
        ));
        let (consumer, _metrics) = consumer_with(
            Arc::clone(&store),
            vec![single_symbol_index("ALPHA", "GOLD", 1800.0)],
        );
        let consumer = consumer.with_dispatcher(Arc::clone(&dispatcher));

        consumer
            .handle_frame(&price_message("GOLD", 1900.0, "2026-08-20T10:00:00Z"))
            .await;
        let stored = store
            .get_latest_index("ALPHA")
            .await
            .expect("read must succeed")
            .expect("must be stored");

        drop(consumer);
        let dispatcher = Arc::try_unwrap(dispatcher).unwrap_or_else(|_| panic!("dispatcher still shared"));
        let stats = dispatcher.shutdown().await;
        assert_eq!(stats.generated, 1);

        let insight = store
            .get_latest_insights("ALPHA")
            .await
            .expect("read must succeed")
            .expect("insight must be stored");
        assert_eq!(insight.generated_at, stored.timestamp);
        assert!(insight.response.summary.starts_with("ALPHA at"));
    }
}
