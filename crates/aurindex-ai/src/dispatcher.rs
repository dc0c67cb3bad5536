//! Fire-and-forget insight dispatch.
//!
//! The consumer hands a finished computation to [`InsightDispatcher::submit`]
//! and moves on immediately. A bounded queue feeds a small pool of workers
//! that call the model and persist the response. Nothing on this path can
//! block or fail an index computation: a full queue drops the request, a
//! model or store failure is counted and logged, and the next cycle simply
//! produces a fresh request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aurindex_core::domain::InsightRequest;
use aurindex_core::store::{IndexStore, InsightRecord};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::InsightModel;

type SharedReceiver = Arc<Mutex<mpsc::Receiver<InsightRequest>>>;

#[derive(Default)]
struct DispatcherCounters {
    generated: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time dispatcher counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatcherStats {
    /// Insights generated and persisted.
    pub generated: u64,
    /// Model or persistence failures. These requests are never retried.
    pub failed: u64,
    /// Requests rejected because the queue was full or closed.
    pub dropped: u64,
}

/// Background insight pipeline: bounded queue, worker pool, counters.
pub struct InsightDispatcher {
    sender: mpsc::Sender<InsightRequest>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<DispatcherCounters>,
}

impl InsightDispatcher {
    /// Start `workers` background tasks draining a queue of `capacity`
    /// requests. Both are clamped to at least 1.
    pub fn new(
        model: Arc<dyn InsightModel>,
        store: Arc<dyn IndexStore>,
        workers: usize,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver: SharedReceiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(DispatcherCounters::default());

        let workers = (0..workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&receiver),
                    Arc::clone(&model),
                    Arc::clone(&store),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        Self {
            sender,
            workers,
            counters,
        }
    }

    /// Enqueue a request without waiting. Returns `false` if it was dropped.
    pub fn submit(&self, request: InsightRequest) -> bool {
        match self.sender.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(index = %request.index_name, "insight queue full, dropping request");
                false
            }
            Err(TrySendError::Closed(request)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(index = %request.index_name, "insight queue closed, dropping request");
                false
            }
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            generated: self.counters.generated.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Close the queue, let the workers drain what is already enqueued, and
    /// return the final counters.
    pub async fn shutdown(self) -> DispatcherStats {
        let Self {
            sender,
            workers,
            counters,
        } = self;
        drop(sender);
        for handle in workers {
            if let Err(err) = handle.await {
                warn!("insight worker terminated abnormally: {err}");
            }
        }
        DispatcherStats {
            generated: counters.generated.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
        }
    }
}

async fn worker_loop(
    worker: usize,
    receiver: SharedReceiver,
    model: Arc<dyn InsightModel>,
    store: Arc<dyn IndexStore>,
    counters: Arc<DispatcherCounters>,
) {
    loop {
        let request = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(request) = request else { break };
        process(&*model, &*store, &counters, request).await;
    }
    debug!(worker, "insight worker stopped");
}

async fn process(
    model: &dyn InsightModel,
    store: &dyn IndexStore,
    counters: &DispatcherCounters,
    request: InsightRequest,
) {
    let index_name = request.index_name.clone();
    let response = match model.generate(&request).await {
        Ok(response) => response,
        Err(err) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                index = %index_name,
                model = model.name(),
                code = err.code(),
                "insight generation failed: {err}"
            );
            return;
        }
    };

    let record = InsightRecord::new(index_name.clone(), request.timestamp, response);
    match store.store_insights(record).await {
        Ok(()) => {
            counters.generated.fetch_add(1, Ordering::Relaxed);
            debug!(index = %index_name, "insight stored");
        }
        Err(err) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(
                index = %index_name,
                code = err.code(),
                "failed to store insight: {err}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use aurindex_core::domain::{PricePoint, Symbol, UtcDateTime};
    use aurindex_core::store::MemoryStore;
    use indexmap::IndexMap;

    use crate::error::InsightError;
    use crate::mock::MockInsightModel;

    use super::*;

    fn request(index_name: &str) -> InsightRequest {
        let observed_at = UtcDateTime::parse("2024-03-01T10:00:00Z").unwrap();
        let symbol = Symbol::parse("GOLD").unwrap();
        let mut prices = IndexMap::new();
        prices.insert(
            symbol.clone(),
            PricePoint {
                price: 1900.12,
                source: "lbma".to_string(),
                observed_at,
            },
        );
        let mut weights = IndexMap::new();
        weights.insert(symbol, 1.0);

        InsightRequest {
            index_name: index_name.to_string(),
            index_value: 1220.72,
            delta_24h_pct: Some(22.07),
            timestamp: observed_at,
            prices,
            weights,
            base_level: 1000.0,
            base_date: "2024-01-01".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submitted_request_is_generated_and_stored() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = InsightDispatcher::new(
            Arc::new(MockInsightModel::new()),
            Arc::clone(&store) as Arc<dyn IndexStore>,
            2,
            8,
        );

        assert!(dispatcher.submit(request("GSOC")));
        let stats = dispatcher.shutdown().await;

        assert_eq!(stats.generated, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.dropped, 0);

        let record = store
            .get_latest_insights("GSOC")
            .await
            .expect("read must succeed")
            .expect("insight must be stored");
        assert_eq!(record.index_name, "GSOC");
        assert_eq!(
            record.generated_at,
            UtcDateTime::parse("2024-03-01T10:00:00Z").unwrap()
        );
        assert_eq!(record.response.summary, "GSOC at 1220.72 (+22.07% over 24h).");
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        // Single-threaded test runtime: workers cannot run between submits,
        // so the first request fills the queue and the rest must drop.
        let store = Arc::new(MemoryStore::new());
        let dispatcher = InsightDispatcher::new(
            Arc::new(MockInsightModel::new()),
            Arc::clone(&store) as Arc<dyn IndexStore>,
            1,
            1,
        );

        assert!(dispatcher.submit(request("GSOC")));
        assert!(!dispatcher.submit(request("GSOC")));
        assert!(!dispatcher.submit(request("GSOC")));

        let stats = dispatcher.shutdown().await;
        assert_eq!(stats.generated, 1);
        assert_eq!(stats.dropped, 2);
    }

    #[tokio::test]
    async fn test_model_failure_is_counted_not_propagated() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = InsightDispatcher::new(
            Arc::new(MockInsightModel::new().failing_with(InsightError::upstream("outage"))),
            Arc::clone(&store) as Arc<dyn IndexStore>,
            1,
            4,
        );

        assert!(dispatcher.submit(request("GSOC")));
        let stats = dispatcher.shutdown().await;

        assert_eq!(stats.generated, 0);
        assert_eq!(stats.failed, 1);
        assert!(store
            .get_latest_insights("GSOC")
            .await
            .expect("read must succeed")
            .is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_counted_and_nothing_persisted() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes_for("GSOC").await;
        let dispatcher = InsightDispatcher::new(
            Arc::new(MockInsightModel::new()),
            Arc::clone(&store) as Arc<dyn IndexStore>,
            1,
            4,
        );

        assert!(dispatcher.submit(request("GSOC")));
        let stats = dispatcher.shutdown().await;

        assert_eq!(stats.generated, 0);
        assert_eq!(stats.failed, 1);
        assert!(store
            .get_latest_insights("GSOC")
            .await
            .expect("read must succeed")
            .is_none());
    }
}
