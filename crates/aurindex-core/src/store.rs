//! Persistence contract for index values, insights, and index definitions.
//!
//! The consumer never talks to a database directly; it goes through
//! [`IndexStore`], which any storage backend implements.
//!
//! # Operations
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`store_index_value`](IndexStore::store_index_value) | Idempotent upsert keyed by (timestamp, index name) |
//! | [`get_latest_index`](IndexStore::get_latest_index) | Most recent value for an index |
//! | [`index_history`](IndexStore::index_history) | Recent values, newest first |
//! | [`get_index_delta_24h`](IndexStore::get_index_delta_24h) | Change vs. the level ~24h ago |
//! | [`get_index_config`](IndexStore::get_index_config) | Stored index definition |
//! | [`upsert_index_config`](IndexStore::upsert_index_config) | Create or replace a definition |
//! | [`list_index_configs`](IndexStore::list_index_configs) | All stored definitions |
//! | [`store_insights`](IndexStore::store_insights) | Append one generated insight |
//! | [`get_latest_insights`](IndexStore::get_latest_insights) | Newest insight for an index |
//! | [`recent_insights`](IndexStore::recent_insights) | Recent insights, newest first |
//!
//! [`MemoryStore`] is the reference implementation used by tests and
//! embedders without a durable backend; it honors the same upsert and
//! ordering semantics.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::calculator::IndexCalculator;
use crate::domain::{IndexConfig, IndexResult, InsightResponse, UtcDateTime};

/// Storage error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Unavailable,
    WriteFailed,
    QueryFailed,
    InvalidData,
    Internal,
}

/// Structured storage error; `retryable` drives caller backoff decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
    retryable: bool,
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn write_failed(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::WriteFailed,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::QueryFailed,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::InvalidData,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            StoreErrorKind::Unavailable => "store.unavailable",
            StoreErrorKind::WriteFailed => "store.write_failed",
            StoreErrorKind::QueryFailed => "store.query_failed",
            StoreErrorKind::InvalidData => "store.invalid_data",
            StoreErrorKind::Internal => "store.internal",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for StoreError {}

/// One persisted insight, keyed by index name and generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub index_name: String,
    pub generated_at: UtcDateTime,
    pub response: InsightResponse,
}

impl InsightRecord {
    pub fn new(
        index_name: impl Into<String>,
        generated_at: UtcDateTime,
        response: InsightResponse,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            generated_at,
            response,
        }
    }
}

/// Storage backend contract.
///
/// Implementations must be `Send + Sync`; the consumer and the background
/// insight workers call them concurrently. Writes must be safe under
/// concurrent callers (the upsert key carries the discipline).
pub trait IndexStore: Send + Sync {
    /// Upsert one computed value; a retry with the same
    /// (timestamp, index name) leaves exactly one row with the latest payload.
    fn store_index_value<'a>(
        &'a self,
        result: IndexResult,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    /// Most recent value for `index_name`, if any exists.
    fn get_latest_index<'a>(
        &'a self,
        index_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<IndexResult>, StoreError>> + Send + 'a>>;

    /// Up to `limit` recent values for `index_name`, newest first.
    fn index_history<'a>(
        &'a self,
        index_name: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexResult>, StoreError>> + Send + 'a>>;

    /// Percentage change of the latest stored value against the newest value
    /// at least 24 hours old. Absent until both exist.
    fn get_index_delta_24h<'a>(
        &'a self,
        index_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<f64>, StoreError>> + Send + 'a>>;

    /// Stored definition for `name`, if one has been seeded.
    fn get_index_config<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<IndexConfig>, StoreError>> + Send + 'a>>;

    /// Create or replace the definition keyed by its name.
    fn upsert_index_config<'a>(
        &'a self,
        config: IndexConfig,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    /// All stored definitions, in name order.
    fn list_index_configs<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexConfig>, StoreError>> + Send + 'a>>;

    /// Append one generated insight. Insights are never overwritten; readers
    /// take the newest.
    fn store_insights<'a>(
        &'a self,
        record: InsightRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    /// Newest insight for `index_name`, if any has been generated.
    fn get_latest_insights<'a>(
        &'a self,
        index_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<InsightRecord>, StoreError>> + Send + 'a>>;

    /// Up to `limit` recent insights for `index_name`, newest first.
    fn recent_insights<'a>(
        &'a self,
        index_name: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<InsightRecord>, StoreError>> + Send + 'a>>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    // Per index, sorted ascending by timestamp.
    values: HashMap<String, Vec<IndexResult>>,
    insights: HashMap<String, Vec<InsightRecord>>,
    configs: HashMap<String, IndexConfig>,
    failing_indices: Vec<String>,
}

/// In-memory [`IndexStore`] with the same observable semantics as the
/// durable backend. Supports per-index write fault injection so isolation
/// behavior can be exercised without a real storage outage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes for `index_name` fail with a retryable error until cleared.
    pub async fn fail_writes_for(&self, index_name: &str) {
        let mut inner = self.inner.lock().await;
        if !inner.failing_indices.iter().any(|name| name == index_name) {
            inner.failing_indices.push(index_name.to_string());
        }
    }

    pub async fn clear_write_faults(&self) {
        self.inner.lock().await.failing_indices.clear();
    }

    /// Total number of stored values across all indices.
    pub async fn value_count(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.values.values().map(Vec::len).sum()
    }
}

impl IndexStore for MemoryStore {
    fn store_index_value<'a>(
        &'a self,
        result: IndexResult,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner
                .failing_indices
                .iter()
                .any(|name| name == &result.index_name)
            {
                return Err(StoreError::write_failed(format!(
                    "injected write fault for index '{}'",
                    result.index_name
                )));
            }

            let rows = inner.values.entry(result.index_name.clone()).or_default();
            match rows
                .iter_mut()
                .find(|row| row.timestamp == result.timestamp)
            {
                Some(row) => *row = result,
                None => {
                    rows.push(result);
                    rows.sort_by_key(|row| row.timestamp);
                }
            }
            Ok(())
        })
    }

    fn get_latest_index<'a>(
        &'a self,
        index_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<IndexResult>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            Ok(inner
                .values
                .get(index_name)
                .and_then(|rows| rows.last().cloned()))
        })
    }

    fn index_history<'a>(
        &'a self,
        index_name: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexResult>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            let rows = match inner.values.get(index_name) {
                Some(rows) => rows.iter().rev().take(limit).cloned().collect(),
                None => Vec::new(),
            };
            Ok(rows)
        })
    }

    fn get_index_delta_24h<'a>(
        &'a self,
        index_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<f64>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let cutoff = UtcDateTime::now().minus_hours(24);
            let inner = self.inner.lock().await;
            let Some(rows) = inner.values.get(index_name) else {
                return Ok(None);
            };
            let Some(current) = rows.last().map(|row| row.index_value) else {
                return Ok(None);
            };
            let past = rows
                .iter()
                .rev()
                .find(|row| row.timestamp <= cutoff)
                .map(|row| row.index_value);
            Ok(past
                .filter(|past| *past > 0.0)
                .map(|past| IndexCalculator::compute_delta_24h(current, past)))
        })
    }

    fn get_index_config<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<IndexConfig>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            Ok(inner.configs.get(name).cloned())
        })
    }

    fn upsert_index_config<'a>(
        &'a self,
        config: IndexConfig,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            inner.configs.insert(config.name.clone(), config);
            Ok(())
        })
    }

    fn list_index_configs<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexConfig>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            let mut configs: Vec<IndexConfig> = inner.configs.values().cloned().collect();
            configs.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(configs)
        })
    }

    fn store_insights<'a>(
        &'a self,
        record: InsightRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            if inner
                .failing_indices
                .iter()
                .any(|name| name == &record.index_name)
            {
                return Err(StoreError::write_failed(format!(
                    "injected write fault for index '{}'",
                    record.index_name
                )));
            }
            let rows = inner.insights.entry(record.index_name.clone()).or_default();
            rows.push(record);
            rows.sort_by_key(|row| row.generated_at);
            Ok(())
        })
    }

    fn get_latest_insights<'a>(
        &'a self,
        index_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<InsightRecord>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            Ok(inner
                .insights
                .get(index_name)
                .and_then(|rows| rows.last().cloned()))
        })
    }

    fn recent_insights<'a>(
        &'a self,
        index_name: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<InsightRecord>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            let rows = match inner.insights.get(index_name) {
                Some(rows) => rows.iter().rev().take(limit).cloned().collect(),
                None => Vec::new(),
            };
            Ok(rows)
        })
    }
}
