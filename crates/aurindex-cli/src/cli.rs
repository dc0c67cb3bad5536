//! CLI argument definitions for Aurindex.
//!
//! This module contains the command-line interface structure using Clap.
//! The CLI covers one-shot operator work: computing an index on demand,
//! inspecting the warehouse, replaying captured price messages, and
//! producing well-formed test messages.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `compute` | Compute one index value now and persist it |
//! | `history` | Show recent stored values for an index |
//! | `insights` | Show recent stored insights for an index |
//! | `replay` | Feed captured NDJSON price messages through the pipeline |
//! | `emit` | Produce well-formed NDJSON price messages |
//! | `init` | Create the data directory and seed index definitions |
//! | `validate-config` | Check a configuration file without starting anything |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--json` | `false` | Machine-readable JSON output |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--config` | none | Service configuration file (YAML) |
//!
//! # Examples
//!
//! ```bash
//! # Compute the default basket from explicit prices
//! aurindex compute GSOC --price GOLD=1900.12 --price SILVER=24.31 \
//!     --price OIL=78.45 --price BTC=27450 --price ETH=1850
//!
//! # Inspect what the daemon has stored
//! aurindex history GSOC --limit 5
//! aurindex insights GSOC
//!
//! # Push one test message into a running daemon
//! aurindex emit GOLD --price 1905.5 --target 127.0.0.1:7600
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use aurindex_core::IndexMethod;

/// Aurindex - streaming composite-index pipeline CLI
///
/// Operates on the same warehouse and configuration as the `aurindexd`
/// daemon, so values computed here and values computed by the stream
/// consumer land in one place.
#[derive(Debug, Parser)]
#[command(
    name = "aurindex",
    author,
    version,
    about = "Composite-index pipeline CLI",
    long_about = "Aurindex computes weighted composite indices over streamed asset prices.\n\
This binary is the operator side of the pipeline:\n\
\n\
  • On-demand index computation against the shared warehouse\n\
  • History and insight inspection\n\
  • Replay of captured NDJSON price messages\n\
  • Test-message production for a running daemon\n\
\n\
Use 'aurindex <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Service configuration file (YAML).
    ///
    /// Falls back to the AURINDEX_CONFIG environment variable, then to
    /// built-in defaults (the GSOC basket, warehouse under ~/.aurindex).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Computation method selector, spelled like the stored `method` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    /// Weighted price-over-base ratios scaled by the base level.
    #[value(name = "level_normalized")]
    LevelNormalized,
    /// Weighted period return compounded onto the previous stored level.
    #[value(name = "return_based")]
    ReturnBased,
}

impl From<MethodArg> for IndexMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::LevelNormalized => Self::LevelNormalized,
            MethodArg::ReturnBased => Self::ReturnBased,
        }
    }
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// 🧮 Compute one index value now and persist it.
    ///
    /// Prices come from --price overrides; the index definition comes from
    /// the configuration file or the warehouse. The result is written to
    /// the warehouse exactly like a stream-computed value.
    ///
    /// # Examples
    ///
    ///   aurindex compute GSOC --price GOLD=1900.12 --price SILVER=24.31 \
    ///       --price OIL=78.45 --price BTC=27450 --price ETH=1850
    ///   aurindex compute GSOC --method return_based --price GOLD=1920 ...
    Compute(ComputeArgs),

    /// 📊 Show recent stored values for an index, newest first.
    History(HistoryArgs),

    /// 💬 Show recent stored insights for an index, newest first.
    Insights(InsightsArgs),

    /// 🔁 Feed captured NDJSON price messages through the pipeline.
    ///
    /// Each line is handled exactly like a live stream message: parsed,
    /// cached, and followed by a full computation pass over every
    /// configured index. Results land in the warehouse.
    ///
    /// # Examples
    ///
    ///   aurindex replay captured-frames.ndjson
    ///   cat frames.ndjson | aurindex replay -
    Replay(ReplayArgs),

    /// 📤 Produce well-formed NDJSON price messages.
    ///
    /// Without --target the messages go to stdout; with --target they are
    /// sent to a running daemon's TCP ingest endpoint. Without --price the
    /// configured base price of each symbol is used, which makes the
    /// output deterministic.
    ///
    /// # Examples
    ///
    ///   aurindex emit
    ///   aurindex emit GOLD --price 1905.5
    ///   aurindex emit BTC ETH --target 127.0.0.1:7600
    Emit(EmitArgs),

    /// 🏗️ Create the data directory, apply migrations, seed definitions.
    Init(InitArgs),

    /// ✅ Check a configuration file without starting the service.
    ValidateConfig(ValidateConfigArgs),
}

/// Arguments for the `compute` command.
#[derive(Debug, Args)]
pub struct ComputeArgs {
    /// Index name (e.g. GSOC).
    pub index: String,

    /// Computation method.
    #[arg(long, value_enum, default_value_t = MethodArg::LevelNormalized)]
    pub method: MethodArg,

    /// Price for one basket symbol, as SYMBOL=VALUE (repeatable).
    ///
    /// Every symbol in the basket needs a price before the index can be
    /// computed; missing symbols are reported by name.
    #[arg(long = "price", value_name = "SYMBOL=VALUE")]
    pub prices: Vec<String>,
}

/// Arguments for the `history` command.
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Index name.
    pub index: String,

    /// Maximum number of values to show.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

/// Arguments for the `insights` command.
#[derive(Debug, Args)]
pub struct InsightsArgs {
    /// Index name.
    pub index: String,

    /// Maximum number of insights to show.
    #[arg(long, default_value_t = 1)]
    pub limit: usize,
}

/// Arguments for the `replay` command.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// NDJSON file of price messages; '-' reads stdin.
    pub file: PathBuf,
}

/// Arguments for the `emit` command.
#[derive(Debug, Args)]
pub struct EmitArgs {
    /// Symbols to emit. Defaults to every configured basket symbol.
    #[arg(num_args = 0..)]
    pub symbols: Vec<String>,

    /// Explicit price; requires exactly one symbol.
    #[arg(long)]
    pub price: Option<f64>,

    /// Value for the message's source field.
    #[arg(long, default_value = "aurindex-cli")]
    pub source: String,

    /// Send to a TCP ingest endpoint instead of stdout.
    #[arg(long, value_name = "HOST:PORT")]
    pub target: Option<String>,
}

/// Arguments for the `init` command.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Data directory override.
    #[arg(long, value_name = "DIR")]
    pub home: Option<PathBuf>,
}

/// Arguments for the `validate-config` command.
#[derive(Debug, Args)]
pub struct ValidateConfigArgs {
    /// Configuration file to check.
    pub file: PathBuf,
}
