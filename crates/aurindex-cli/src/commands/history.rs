use aurindex_service::{open_warehouse, ServiceConfig};

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::CommandOutput;

pub fn run(args: &HistoryArgs, config: &ServiceConfig) -> Result<CommandOutput, CliError> {
    let warehouse = open_warehouse(&config.storage)?;
    let rows = warehouse.index_history(&args.index, args.limit)?;

    let mut outcome = CommandOutput::new(serde_json::to_value(&rows)?);
    if rows.is_empty() {
        return Ok(outcome.with_line(format!("no stored values for '{}'", args.index)));
    }

    outcome = outcome.with_line(format!("{} values, newest first:", args.index));
    for row in &rows {
        let delta = match row.delta_24h_pct {
            Some(delta) => format!("{delta:+.2}%"),
            None => String::from("n/a"),
        };
        outcome = outcome.with_line(format!(
            "  {}  {:>12}  {:<16}  {delta}",
            row.timestamp.format_rfc3339(),
            row.index_value,
            row.method.as_str(),
        ));
    }

    Ok(outcome)
}
