use serde_json::json;

use aurindex_service::{open_warehouse, ServiceConfig, StorageConfig};

use crate::cli::InitArgs;
use crate::error::CliError;

use super::CommandOutput;

pub fn run(args: &InitArgs, config: &ServiceConfig) -> Result<CommandOutput, CliError> {
    let storage = match &args.home {
        Some(home) => StorageConfig {
            home: Some(home.clone()),
            max_pool_size: config.storage.max_pool_size,
        },
        None => config.storage.clone(),
    };

    let warehouse = open_warehouse(&storage)?;
    warehouse.seed_configs(&config.indices)?;

    let names: Vec<&str> = config
        .indices
        .iter()
        .map(|index| index.name.as_str())
        .collect();

    Ok(CommandOutput::new(json!({
        "db_path": warehouse.db_path(),
        "indices": names,
    }))
    .with_line(format!("warehouse ready at {}", warehouse.db_path().display()))
    .with_line(format!(
        "seeded {} index definition(s): {}",
        names.len(),
        names.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_the_database_and_seeds_definitions() {
        let temp = tempdir().expect("tempdir");
        let config = ServiceConfig::default();
        let args = InitArgs {
            home: Some(temp.path().join("aurindex-home")),
        };

        let outcome = run(&args, &config).expect("init");
        assert!(outcome.lines[0].starts_with("warehouse ready at"));
        assert!(outcome.lines[1].contains("GSOC"));

        let db_path = temp
            .path()
            .join("aurindex-home")
            .join("data")
            .join("aurindex.duckdb");
        assert!(db_path.exists());

        let storage = StorageConfig {
            home: Some(temp.path().join("aurindex-home")),
            max_pool_size: 2,
        };
        let warehouse = open_warehouse(&storage).expect("warehouse");
        assert!(warehouse
            .get_index_config("GSOC")
            .expect("read")
            .is_some());
    }
}
