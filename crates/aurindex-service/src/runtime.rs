//! Daemon composition: wire config, warehouse, consumer, intake, and the
//! insight dispatcher together, then run until a shutdown signal.
//!
//! Startup is strict where the contract requires it: failing to open the
//! warehouse or to bind the intake socket aborts the process. Everything
//! after that point degrades per index or per insight instead of exiting.

use std::sync::Arc;
use std::time::Duration;

use aurindex_ai::{
    InsightDispatcher, InsightModel, MockInsightModel, OpenAIConfig, OpenAiInsightModel,
};
use aurindex_core::store::IndexStore;
use aurindex_core::transport::ChannelSource;
use aurindex_core::ValidationError;
use aurindex_warehouse::{IndexWarehouse, WarehouseConfig, WarehouseError, WarehouseStore};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{ConfigError, InsightProvider, InsightsConfig, ServiceConfig, StorageConfig};
use crate::consumer::IndexConsumer;
use crate::metrics::PipelineMetrics;
use crate::sources::spawn_tcp_listener;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind price intake on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open warehouse: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("invalid index configuration: {0}")]
    InvalidIndexConfig(#[from] ValidationError),
}

/// Run the pipeline until SIGINT. Returns once intake has stopped, in-flight
/// work has finished, and the insight queue has been drained.
pub async fn run(config: ServiceConfig) -> Result<(), ServiceError> {
    let warehouse = open_warehouse(&config.storage)?;
    info!(db = %warehouse.db_path().display(), "warehouse ready");
    warehouse.seed_configs(&config.indices)?;

    let store: Arc<dyn IndexStore> = Arc::new(WarehouseStore::new(warehouse));
    let metrics = Arc::new(PipelineMetrics::new());

    let mut consumer = IndexConsumer::new(
        Arc::clone(&store),
        config.indices.clone(),
        Arc::clone(&metrics),
    )?;

    let dispatcher = if config.insights.enabled {
        let dispatcher = Arc::new(InsightDispatcher::new(
            build_model(&config.insights),
            Arc::clone(&store),
            config.insights.workers,
            config.insights.queue_capacity,
        ));
        consumer = consumer.with_dispatcher(Arc::clone(&dispatcher));
        Some(dispatcher)
    } else {
        info!("insight generation disabled");
        None
    };

    let (sender, source) = ChannelSource::pair("tcp-intake", config.intake.queue_capacity.max(1));
    let (listen_addr, listener) = spawn_tcp_listener(&config.intake.listen_addr, sender)
        .await
        .map_err(|source| ServiceError::Bind {
            addr: config.intake.listen_addr.clone(),
            source,
        })?;
    info!(%listen_addr, "price intake listening");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = Arc::new(consumer);
    let consumer_task = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run(source, shutdown_rx).await })
    };

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping intake");
    let _ = shutdown_tx.send(true);
    if let Err(err) = consumer_task.await {
        warn!("consumer task terminated abnormally: {err}");
    }
    listener.abort();

    drop(consumer);
    if let Some(dispatcher) = dispatcher {
        match Arc::try_unwrap(dispatcher) {
            Ok(dispatcher) => {
                let stats = dispatcher.shutdown().await;
                info!(
                    generated = stats.generated,
                    failed = stats.failed,
                    dropped = stats.dropped,
                    "insight dispatcher drained"
                );
            }
            Err(dispatcher) => {
                let stats = dispatcher.stats();
                info!(
                    generated = stats.generated,
                    failed = stats.failed,
                    dropped = stats.dropped,
                    "insight queue left undrained"
                );
            }
        }
    }

    let snapshot = metrics.snapshot();
    info!(
        messages = snapshot.messages_received,
        malformed = snapshot.messages_malformed,
        cycles = snapshot.cycles_completed,
        stored = snapshot.results_stored,
        persist_failures = snapshot.persist_failures,
        validation_skips = snapshot.total_validation_skips(),
        "pipeline stopped"
    );
    Ok(())
}

/// Open the warehouse under the configured home, or the default resolution
/// when none is set.
pub fn open_warehouse(storage: &StorageConfig) -> Result<IndexWarehouse, WarehouseError> {
    let mut warehouse_config = match &storage.home {
        Some(home) => WarehouseConfig {
            aurindex_home: home.clone(),
            db_path: home.join("data").join("aurindex.duckdb"),
            max_pool_size: storage.max_pool_size,
        },
        None => WarehouseConfig::default(),
    };
    warehouse_config.max_pool_size = storage.max_pool_size.max(1);
    IndexWarehouse::open(warehouse_config)
}

/// Build the configured insight model.
pub fn build_model(insights: &InsightsConfig) -> Arc<dyn InsightModel> {
    match insights.provider {
        InsightProvider::Mock => Arc::new(MockInsightModel::new()),
        InsightProvider::OpenAi => {
            let mut openai_config = OpenAIConfig::new();
            if let Some(api_base) = &insights.api_base {
                openai_config = openai_config.with_api_base(api_base);
            }
            if let Some(api_key) = &insights.api_key {
                openai_config = openai_config.with_api_key(api_key);
            }
            Arc::new(OpenAiInsightModel::with_config(
                openai_config,
                insights.model.clone(),
                Duration::from_secs(insights.timeout_secs),
            ))
        }
    }
}

async fn wait_for_shutdown() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        // Without a signal handler there is no orderly way down; park this
        // task instead of shutting a healthy pipeline.
        std::future::pending::<()>().await;
    }
}
