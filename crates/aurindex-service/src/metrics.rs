//! Operational counters for the pipeline.
//!
//! Counters are plain atomics behind one shared handle. Validation skips are
//! tracked per index so a single misconfigured basket is visible without
//! drowning in the totals.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct PipelineMetrics {
    messages_received: AtomicU64,
    messages_malformed: AtomicU64,
    stale_observations: AtomicU64,
    cycles_completed: AtomicU64,
    results_stored: AtomicU64,
    persist_failures: AtomicU64,
    validation_skips: Mutex<HashMap<String, u64>>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.messages_malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// An observation older than the cached one arrived and was ignored.
    pub fn record_stale_observation(&self) {
        self.stale_observations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_result_stored(&self) {
        self.results_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_skip(&self, index_name: &str) {
        let mut skips = self
            .validation_skips
            .lock()
            .expect("metrics mutex poisoned");
        *skips.entry(index_name.to_string()).or_insert(0) += 1;
    }

    pub fn validation_skips_for(&self, index_name: &str) -> u64 {
        self.validation_skips
            .lock()
            .expect("metrics mutex poisoned")
            .get(index_name)
            .copied()
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_malformed: self.messages_malformed.load(Ordering::Relaxed),
            stale_observations: self.stale_observations.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            results_stored: self.results_stored.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            validation_skips: self
                .validation_skips
                .lock()
                .expect("metrics mutex poisoned")
                .clone(),
        }
    }
}

/// Point-in-time copy of every pipeline counter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_malformed: u64,
    pub stale_observations: u64,
    pub cycles_completed: u64,
    pub results_stored: u64,
    pub persist_failures: u64,
    pub validation_skips: HashMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn total_validation_skips(&self) -> u64 {
        self.validation_skips.values().sum()
    }
}
