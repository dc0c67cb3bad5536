use std::path::PathBuf;
use std::process::ExitCode;

use aurindex_service::{run, ServiceConfig, ServiceError};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn start() -> Result<(), ServiceError> {
    let config = match config_path() {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            ServiceConfig::load(&path)?
        }
        None => {
            info!("no configuration file given, using defaults");
            ServiceConfig::default()
        }
    };
    run(config).await
}

/// First CLI argument, then the `AURINDEX_CONFIG` environment variable.
fn config_path() -> Option<PathBuf> {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var("AURINDEX_CONFIG").ok().map(PathBuf::from))
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
