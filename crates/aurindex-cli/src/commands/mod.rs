mod compute;
mod emit;
mod history;
mod init;
mod insights;
mod replay;
mod validate_config;

use std::env;
use std::path::PathBuf;

use serde_json::Value;

use aurindex_core::Symbol;
use aurindex_service::ServiceConfig;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// What a command hands back for rendering: a JSON payload plus the
/// human-readable lines describing the same outcome.
pub struct CommandOutput {
    pub data: Value,
    pub lines: Vec<String>,
}

impl CommandOutput {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            lines: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    match &cli.command {
        Command::Compute(args) => compute::run(args, &load_service_config(cli)?).await,
        Command::History(args) => history::run(args, &load_service_config(cli)?),
        Command::Insights(args) => insights::run(args, &load_service_config(cli)?),
        Command::Replay(args) => replay::run(args, &load_service_config(cli)?).await,
        Command::Emit(args) => emit::run(args, &load_service_config(cli)?).await,
        Command::Init(args) => init::run(args, &load_service_config(cli)?),
        Command::ValidateConfig(args) => validate_config::run(args),
    }
}

/// Resolve the service configuration the same way the daemon does:
/// explicit flag, then `AURINDEX_CONFIG`, then built-in defaults.
fn load_service_config(cli: &Cli) -> Result<ServiceConfig, CliError> {
    let path = cli
        .config
        .clone()
        .or_else(|| env::var_os("AURINDEX_CONFIG").map(PathBuf::from));

    match path {
        Some(path) => Ok(ServiceConfig::load(&path)?),
        None => Ok(ServiceConfig::default()),
    }
}

/// Quote unit for a symbol, matching the upstream feed conventions.
fn default_unit(symbol: &Symbol) -> &'static str {
    match symbol.as_str() {
        "GOLD" | "SILVER" => "USD/oz",
        "OIL" => "USD/bbl",
        _ => "USD",
    }
}

/// Parse one `SYMBOL=VALUE` price override.
fn parse_price_pair(raw: &str) -> Result<(Symbol, f64), CliError> {
    let (symbol, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::Command(format!("expected SYMBOL=VALUE, got '{raw}'")))?;

    let symbol = Symbol::parse(symbol)?;
    let price: f64 = value
        .trim()
        .parse()
        .map_err(|_| CliError::Command(format!("'{value}' is not a valid price for {symbol}")))?;

    Ok((symbol, price))
}
