use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use aurindex_core::{PriceObservation, Symbol, UtcDateTime};
use aurindex_service::ServiceConfig;

use crate::cli::EmitArgs;
use crate::error::CliError;

use super::{default_unit, CommandOutput};

pub async fn run(args: &EmitArgs, config: &ServiceConfig) -> Result<CommandOutput, CliError> {
    let observations = build_observations(args, config)?;

    let mut lines = Vec::with_capacity(observations.len());
    for observation in &observations {
        lines.push(serde_json::to_string(observation)?);
    }

    let data = serde_json::to_value(&observations)?;
    match &args.target {
        Some(target) => {
            let mut stream = TcpStream::connect(target.as_str()).await?;
            for line in &lines {
                stream.write_all(line.as_bytes()).await?;
                stream.write_all(b"\n").await?;
            }
            stream.shutdown().await?;

            Ok(CommandOutput::new(data)
                .with_line(format!("sent {} message(s) to {target}", lines.len())))
        }
        None => Ok(CommandOutput { data, lines }),
    }
}

fn build_observations(
    args: &EmitArgs,
    config: &ServiceConfig,
) -> Result<Vec<PriceObservation>, CliError> {
    if args.price.is_some() && args.symbols.len() != 1 {
        return Err(CliError::Command(String::from(
            "--price requires exactly one symbol",
        )));
    }

    let symbols = if args.symbols.is_empty() {
        configured_symbols(config)
    } else {
        args.symbols
            .iter()
            .map(|raw| Symbol::parse(raw).map_err(CliError::from))
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut observations = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let price = match args.price {
            Some(price) => price,
            None => base_price(&symbol, config)?,
        };
        observations.push(PriceObservation::new(
            symbol.clone(),
            price,
            default_unit(&symbol),
            UtcDateTime::now(),
            args.source.clone(),
            None,
            1.0,
        )?);
    }

    Ok(observations)
}

/// Every basket symbol across the configured indices, in declared order,
/// deduplicated.
fn configured_symbols(config: &ServiceConfig) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    for index in &config.indices {
        for symbol in index.symbols() {
            if !symbols.contains(symbol) {
                symbols.push(symbol.clone());
            }
        }
    }
    symbols
}

/// Deterministic fallback price: the symbol's configured base price.
fn base_price(symbol: &Symbol, config: &ServiceConfig) -> Result<f64, CliError> {
    for index in &config.indices {
        if let Some(&price) = index.base_prices.get(symbol) {
            return Ok(price);
        }
    }

    Err(CliError::Command(format!(
        "no configured base price for {symbol}; pass --price"
    )))
}
