//! Last-observation-wins price cache keyed by symbol.
//!
//! Replacement rule: an incoming observation replaces the stored one iff no
//! entry exists or the stored `observed_at` is not newer. Ties go to the
//! last writer. Nothing is evicted by time; staleness is judged by readers.
//!
//! The map is split into shards so ingestion writes for one symbol do not
//! contend with snapshot reads for unrelated symbols. Two symbols hashing to
//! the same shard serialize against each other, which is acceptable.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{PriceObservation, Symbol};

const SHARD_COUNT: usize = 16;

type Shard = RwLock<HashMap<Symbol, PriceObservation>>;

/// Thread-safe store of the latest observation per symbol.
///
/// Cloning is cheap and shares the underlying shards.
#[derive(Debug, Clone)]
pub struct PriceCache {
    shards: Arc<[Shard; SHARD_COUNT]>,
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceCache {
    pub fn new() -> Self {
        Self {
            shards: Arc::new(std::array::from_fn(|_| RwLock::new(HashMap::new()))),
        }
    }

    fn shard(&self, symbol: &Symbol) -> &Shard {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % SHARD_COUNT]
    }

    /// Store `observation` unless a strictly newer one is already present.
    ///
    /// Returns `true` if the entry was written, `false` if the incoming
    /// observation was older than the stored one and dropped. Never fails;
    /// content problems are the caller's validation concern.
    pub async fn update(&self, observation: PriceObservation) -> bool {
        let mut shard = self.shard(&observation.symbol).write().await;
        match shard.get(&observation.symbol) {
            Some(stored) if stored.observed_at > observation.observed_at => false,
            _ => {
                shard.insert(observation.symbol.clone(), observation);
                true
            }
        }
    }

    /// Latest stored observation for `symbol`, if any.
    pub async fn get(&self, symbol: &Symbol) -> Option<PriceObservation> {
        let shard = self.shard(symbol).read().await;
        shard.get(symbol).cloned()
    }

    /// Current price for each requested symbol that has an entry.
    ///
    /// Symbols without an entry are absent from the result, never defaulted.
    /// Each key is read atomically; the result as a whole is not a single
    /// point in time across keys.
    pub async fn snapshot<'a, I>(&self, symbols: I) -> HashMap<Symbol, f64>
    where
        I: IntoIterator<Item = &'a Symbol>,
    {
        let mut prices = HashMap::new();
        for symbol in symbols {
            let shard = self.shard(symbol).read().await;
            if let Some(observation) = shard.get(symbol) {
                prices.insert(symbol.clone(), observation.price);
            }
        }
        prices
    }

    /// Like [`snapshot`](Self::snapshot) but keeps the full observations,
    /// for callers that need source and timing alongside the price.
    pub async fn snapshot_observations<'a, I>(
        &self,
        symbols: I,
    ) -> HashMap<Symbol, PriceObservation>
    where
        I: IntoIterator<Item = &'a Symbol>,
    {
        let mut observations = HashMap::new();
        for symbol in symbols {
            let shard = self.shard(symbol).read().await;
            if let Some(observation) = shard.get(symbol) {
                observations.insert(symbol.clone(), observation.clone());
            }
        }
        observations
    }

    /// Number of symbols currently held.
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in self.shards.iter() {
            total += shard.read().await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UtcDateTime;

    fn observation(symbol: &str, price: f64, observed_at: &str) -> PriceObservation {
        PriceObservation::new(
            Symbol::parse(symbol).expect("symbol"),
            price,
            "USD/oz",
            UtcDateTime::parse(observed_at).expect("timestamp"),
            "test-feed",
            None,
            0.99,
        )
        .expect("observation")
    }

    #[tokio::test]
    async fn test_update_replaces_older_entry() {
        let cache = PriceCache::new();

        assert!(cache.update(observation("GOLD", 1900.0, "2026-01-15T10:00:00Z")).await);
        assert!(cache.update(observation("GOLD", 1905.5, "2026-01-15T10:05:00Z")).await);

        let gold = Symbol::parse("GOLD").expect("symbol");
        assert_eq!(cache.get(&gold).await.map(|o| o.price), Some(1905.5));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_drops_out_of_order_observation() {
        let cache = PriceCache::new();

        assert!(cache.update(observation("GOLD", 1905.5, "2026-01-15T10:05:00Z")).await);
        // Arrives late with an earlier observed_at.
        assert!(!cache.update(observation("GOLD", 1900.0, "2026-01-15T10:00:00Z")).await);

        let gold = Symbol::parse("GOLD").expect("symbol");
        let snapshot = cache.snapshot([&gold]).await;
        assert_eq!(snapshot.get(&gold), Some(&1905.5));
    }

    #[tokio::test]
    async fn test_equal_timestamps_last_writer_wins() {
        let cache = PriceCache::new();

        cache.update(observation("BTC", 27450.0, "2026-01-15T10:00:00Z")).await;
        assert!(cache.update(observation("BTC", 27460.0, "2026-01-15T10:00:00Z")).await);

        let btc = Symbol::parse("BTC").expect("symbol");
        assert_eq!(cache.get(&btc).await.map(|o| o.price), Some(27460.0));
    }

    #[tokio::test]
    async fn test_snapshot_restricted_to_requested_symbols() {
        let cache = PriceCache::new();
        cache.update(observation("GOLD", 1900.12, "2026-01-15T10:00:00Z")).await;
        cache.update(observation("SILVER", 24.31, "2026-01-15T10:00:00Z")).await;
        cache.update(observation("BTC", 27450.0, "2026-01-15T10:00:00Z")).await;

        let gold = Symbol::parse("GOLD").expect("symbol");
        let silver = Symbol::parse("SILVER").expect("symbol");
        let oil = Symbol::parse("OIL").expect("symbol");

        let snapshot = cache.snapshot([&gold, &silver, &oil]).await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(&gold), Some(&1900.12));
        assert_eq!(snapshot.get(&silver), Some(&24.31));
        assert!(!snapshot.contains_key(&oil));
    }

    #[tokio::test]
    async fn test_concurrent_updates_across_symbols() {
        let cache = PriceCache::new();
        let symbols = ["GOLD", "SILVER", "OIL", "BTC", "ETH"];

        let mut handles = Vec::new();
        for (i, name) in symbols.iter().enumerate() {
            let cache = cache.clone();
            let name = name.to_string();
            handles.push(tokio::spawn(async move {
                for step in 0..50u32 {
                    let obs = PriceObservation::new(
                        Symbol::parse(&name).expect("symbol"),
                        100.0 + i as f64 + step as f64,
                        "USD",
                        UtcDateTime::now(),
                        "load-test",
                        None,
                        1.0,
                    )
                    .expect("observation");
                    cache.update(obs).await;
                }
            }));
        }
        for handle in handles {
            handle.await.expect("task");
        }

        assert_eq!(cache.len().await, symbols.len());
    }
}
