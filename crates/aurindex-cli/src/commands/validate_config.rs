use serde_json::json;

use aurindex_service::{InsightProvider, ServiceConfig};

use crate::cli::ValidateConfigArgs;
use crate::error::CliError;

use super::CommandOutput;

pub fn run(args: &ValidateConfigArgs) -> Result<CommandOutput, CliError> {
    let config = ServiceConfig::load(&args.file)?;

    let names: Vec<&str> = config
        .indices
        .iter()
        .map(|index| index.name.as_str())
        .collect();
    let provider = match config.insights.provider {
        InsightProvider::Mock => "mock",
        InsightProvider::OpenAi => "openai",
    };
    let insights_state = if config.insights.enabled {
        "enabled"
    } else {
        "disabled"
    };

    Ok(CommandOutput::new(json!({
        "indices": names,
        "listen_addr": config.intake.listen_addr,
        "insights": { "provider": provider, "enabled": config.insights.enabled },
    }))
    .with_line(format!("configuration OK: {}", args.file.display()))
    .with_line(format!("indices : {}", names.join(", ")))
    .with_line(format!("intake  : {}", config.intake.listen_addr))
    .with_line(format!("insights: {provider} ({insights_state})")))
}
