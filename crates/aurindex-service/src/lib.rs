//! # aurindex-service
//!
//! The streaming pipeline daemon. Price messages arrive as newline-delimited
//! JSON over TCP, land in the shared price cache, and every message triggers
//! a computation pass over all configured indices; results go to the DuckDB
//! warehouse and, fire-and-forget, to the insight dispatcher.
//!
//! ```text
//!  publishers ──TCP/NDJSON──▶ intake queue ──▶ IndexConsumer
//!                                               │ per index:
//!                                               │  snapshot → validate →
//!                                               │  compute → delta → persist
//!                                               ▼
//!                                      InsightDispatcher (async)
//! ```
//!
//! The binary is `aurindexd`; see [`config::ServiceConfig`] for the YAML
//! layout and [`runtime::run`] for the composition.

pub mod config;
pub mod consumer;
pub mod metrics;
pub mod runtime;
pub mod sources;

pub use config::{
    ConfigError, InsightProvider, InsightsConfig, IntakeConfig, ServiceConfig, StorageConfig,
};
pub use consumer::{ComputeError, IndexConsumer};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use runtime::{open_warehouse, run, ServiceError};
pub use sources::spawn_tcp_listener;
