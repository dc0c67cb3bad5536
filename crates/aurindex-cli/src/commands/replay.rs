use std::fs;
use std::io::Read;
use std::sync::Arc;

use serde_json::json;

use aurindex_core::IndexStore;
use aurindex_service::{open_warehouse, IndexConsumer, PipelineMetrics, ServiceConfig};
use aurindex_warehouse::WarehouseStore;

use crate::cli::ReplayArgs;
use crate::error::CliError;

use super::CommandOutput;

pub async fn run(args: &ReplayArgs, config: &ServiceConfig) -> Result<CommandOutput, CliError> {
    let frames = read_frames(args)?;

    let warehouse = open_warehouse(&config.storage)?;
    warehouse.seed_configs(&config.indices)?;

    let store: Arc<dyn IndexStore> = Arc::new(WarehouseStore::new(warehouse.clone()));
    let metrics = Arc::new(PipelineMetrics::new());
    let consumer = IndexConsumer::new(store, config.indices.clone(), Arc::clone(&metrics))?;

    for line in frames.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        consumer.handle_frame(line.as_bytes()).await;
    }

    let snapshot = metrics.snapshot();
    let mut lines = vec![format!(
        "replayed {} message(s): {} malformed, {} cycle(s), {} result(s) stored, {} validation skip(s)",
        snapshot.messages_received,
        snapshot.messages_malformed,
        snapshot.cycles_completed,
        snapshot.results_stored,
        snapshot.total_validation_skips(),
    )];

    let mut latest = serde_json::Map::new();
    for name in consumer.index_names() {
        if let Some(row) = warehouse.get_latest_index(&name)? {
            lines.push(format!(
                "{} = {} ({})",
                row.index_name,
                row.index_value,
                row.timestamp.format_rfc3339()
            ));
            latest.insert(name, serde_json::to_value(&row)?);
        }
    }

    let data = json!({
        "messages_received": snapshot.messages_received,
        "messages_malformed": snapshot.messages_malformed,
        "cycles_completed": snapshot.cycles_completed,
        "results_stored": snapshot.results_stored,
        "persist_failures": snapshot.persist_failures,
        "validation_skips": snapshot.total_validation_skips(),
        "latest": latest,
    });

    Ok(CommandOutput { data, lines })
}

fn read_frames(args: &ReplayArgs) -> Result<String, CliError> {
    if args.file.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }

    Ok(fs::read_to_string(&args.file)?)
}
