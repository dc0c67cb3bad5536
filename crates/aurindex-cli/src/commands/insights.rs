use aurindex_service::{open_warehouse, ServiceConfig};

use crate::cli::InsightsArgs;
use crate::error::CliError;

use super::CommandOutput;

pub fn run(args: &InsightsArgs, config: &ServiceConfig) -> Result<CommandOutput, CliError> {
    let warehouse = open_warehouse(&config.storage)?;
    let records = warehouse.recent_insights(&args.index, args.limit)?;

    let mut outcome = CommandOutput::new(serde_json::to_value(&records)?);
    if records.is_empty() {
        return Ok(outcome.with_line(format!("no stored insights for '{}'", args.index)));
    }

    for record in &records {
        outcome = outcome.with_line(format!(
            "{} @ {}",
            record.index_name,
            record.generated_at.format_rfc3339()
        ));
        outcome = outcome.with_line(format!("  summary  : {}", record.response.summary));
        if !record.response.notable_events.is_empty() {
            outcome = outcome.with_line(format!(
                "  events   : {}",
                record.response.notable_events.join(" | ")
            ));
        }
        let sentiment = record
            .response
            .sentiment
            .iter()
            .map(|(symbol, tone)| format!("{symbol}={tone}"))
            .collect::<Vec<_>>()
            .join(" ");
        outcome = outcome.with_line(format!("  sentiment: {sentiment}"));
    }

    Ok(outcome)
}
