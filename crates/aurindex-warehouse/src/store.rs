//! Async adapter exposing the warehouse through the core persistence trait.
//!
//! DuckDB calls are synchronous, so every operation hops onto the blocking
//! thread pool; the consumer loop and insight workers never stall a runtime
//! worker on database I/O.

use std::future::Future;
use std::pin::Pin;

use aurindex_core::{
    IndexConfig, IndexResult, IndexStore, InsightRecord, StoreError,
};

use crate::{IndexWarehouse, WarehouseError};

/// [`IndexStore`] backed by an [`IndexWarehouse`].
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct WarehouseStore {
    warehouse: IndexWarehouse,
}

impl WarehouseStore {
    pub fn new(warehouse: IndexWarehouse) -> Self {
        Self { warehouse }
    }

    /// Direct access to the synchronous warehouse, for callers that are
    /// already off the async runtime.
    pub fn warehouse(&self) -> &IndexWarehouse {
        &self.warehouse
    }
}

async fn run_blocking<T>(
    task: impl FnOnce() -> Result<T, WarehouseError> + Send + 'static,
    map_error: fn(WarehouseError) -> StoreError,
) -> Result<T, StoreError>
where
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| StoreError::internal(format!("storage task failed: {error}")))?
        .map_err(map_error)
}

fn write_error(error: WarehouseError) -> StoreError {
    match error {
        WarehouseError::Io(inner) => StoreError::unavailable(inner.to_string()),
        WarehouseError::CorruptRow(reason) => StoreError::invalid_data(reason),
        other => StoreError::write_failed(other.to_string()),
    }
}

fn read_error(error: WarehouseError) -> StoreError {
    match error {
        WarehouseError::Io(inner) => StoreError::unavailable(inner.to_string()),
        WarehouseError::CorruptRow(reason) => StoreError::invalid_data(reason),
        other => StoreError::query_failed(other.to_string()),
    }
}

impl IndexStore for WarehouseStore {
    fn store_index_value<'a>(
        &'a self,
        result: IndexResult,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        Box::pin(run_blocking(
            move || warehouse.store_index_value(&result),
            write_error,
        ))
    }

    fn get_latest_index<'a>(
        &'a self,
        index_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<IndexResult>, StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        let index_name = index_name.to_string();
        Box::pin(run_blocking(
            move || warehouse.get_latest_index(&index_name),
            read_error,
        ))
    }

    fn index_history<'a>(
        &'a self,
        index_name: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexResult>, StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        let index_name = index_name.to_string();
        Box::pin(run_blocking(
            move || warehouse.index_history(&index_name, limit),
            read_error,
        ))
    }

    fn get_index_delta_24h<'a>(
        &'a self,
        index_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<f64>, StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        let index_name = index_name.to_string();
        Box::pin(run_blocking(
            move || warehouse.get_index_delta_24h(&index_name),
            read_error,
        ))
    }

    fn get_index_config<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<IndexConfig>, StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        let name = name.to_string();
        Box::pin(run_blocking(
            move || warehouse.get_index_config(&name),
            read_error,
        ))
    }

    fn upsert_index_config<'a>(
        &'a self,
        config: IndexConfig,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        Box::pin(run_blocking(
            move || warehouse.upsert_index_config(&config),
            write_error,
        ))
    }

    fn list_index_configs<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<IndexConfig>, StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        Box::pin(run_blocking(
            move || warehouse.list_index_configs(),
            read_error,
        ))
    }

    fn store_insights<'a>(
        &'a self,
        record: InsightRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        Box::pin(run_blocking(
            move || warehouse.store_insights(&record),
            write_error,
        ))
    }

    fn get_latest_insights<'a>(
        &'a self,
        index_name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<InsightRecord>, StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        let index_name = index_name.to_string();
        Box::pin(run_blocking(
            move || warehouse.get_latest_insights(&index_name),
            read_error,
        ))
    }

    fn recent_insights<'a>(
        &'a self,
        index_name: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<InsightRecord>, StoreError>> + Send + 'a>> {
        let warehouse = self.warehouse.clone();
        let index_name = index_name.to_string();
        Box::pin(run_blocking(
            move || warehouse.recent_insights(&index_name, limit),
            read_error,
        ))
    }
}
