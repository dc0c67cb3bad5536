use std::sync::Arc;

use aurindex_core::{IndexConfig, IndexStore, PriceObservation, UtcDateTime};
use aurindex_service::{open_warehouse, IndexConsumer, PipelineMetrics, ServiceConfig};
use aurindex_warehouse::{IndexWarehouse, WarehouseStore};

use crate::cli::ComputeArgs;
use crate::error::CliError;

use super::{default_unit, parse_price_pair, CommandOutput};

pub async fn run(args: &ComputeArgs, config: &ServiceConfig) -> Result<CommandOutput, CliError> {
    let warehouse = open_warehouse(&config.storage)?;
    let index_config = resolve_index_config(&args.index, config, &warehouse)?;

    let store: Arc<dyn IndexStore> = Arc::new(WarehouseStore::new(warehouse));
    let metrics = Arc::new(PipelineMetrics::new());
    let consumer = IndexConsumer::new(store, vec![index_config], metrics)?;

    for raw in &args.prices {
        let (symbol, price) = parse_price_pair(raw)?;
        let observation = PriceObservation::new(
            symbol.clone(),
            price,
            default_unit(&symbol),
            UtcDateTime::now(),
            "aurindex-cli",
            None,
            1.0,
        )?;
        consumer.cache().update(observation).await;
    }

    let result = consumer
        .compute_once(&args.index, args.method.into())
        .await?;

    let delta = match result.delta_24h_pct {
        Some(delta) => format!("{delta:+.2}%"),
        None => String::from("n/a"),
    };

    Ok(CommandOutput::new(serde_json::to_value(&result)?)
        .with_line(format!(
            "{} = {} ({})",
            result.index_name, result.index_value, result.method
        ))
        .with_line(format!("time     : {}", result.timestamp.format_rfc3339()))
        .with_line(format!("24h delta: {delta}")))
}

/// The configuration file wins over the stored definition, mirroring how
/// the daemon seeds the warehouse from the file at startup.
fn resolve_index_config(
    name: &str,
    config: &ServiceConfig,
    warehouse: &IndexWarehouse,
) -> Result<IndexConfig, CliError> {
    if let Some(found) = config.indices.iter().find(|index| index.name == name) {
        return Ok(found.clone());
    }

    if let Some(stored) = warehouse.get_index_config(name)? {
        return Ok(stored);
    }

    Err(CliError::Command(format!(
        "unknown index '{name}'; define it in the configuration file or seed it with 'aurindex init'"
    )))
}
