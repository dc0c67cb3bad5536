use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] aurindex_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Config(#[from] aurindex_service::ConfigError),

    #[error(transparent)]
    Compute(#[from] aurindex_service::ComputeError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Warehouse(#[from] aurindex_warehouse::WarehouseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Config(_) => 2,
            Self::Compute(_) => 3,
            Self::Serialization(_) => 4,
            Self::Warehouse(_) => 6,
            Self::Io(_) => 10,
        }
    }
}
