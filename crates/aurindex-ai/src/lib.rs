//! # aurindex-ai
//!
//! Insight generation for computed index values: a model abstraction, an
//! OpenAI-compatible backend, and a fire-and-forget dispatcher that keeps the
//! hot computation path free of model latency.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`model`] | [`InsightModel`] trait implemented by every backend |
//! | [`openai`] | Chat-completions backend for OpenAI-compatible endpoints |
//! | [`mock`] | Deterministic model for tests and offline runs |
//! | [`prompt`] | Prompt construction from an [`InsightRequest`] |
//! | [`parse`] | Fence stripping, JSON extraction, schema validation |
//! | [`dispatcher`] | Bounded queue + worker pool feeding the store |
//! | [`error`] | [`InsightError`] taxonomy |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use aurindex_ai::{InsightDispatcher, OpenAiInsightModel};
//!
//! let model = Arc::new(OpenAiInsightModel::new("gpt-4o-mini"));
//! let dispatcher = InsightDispatcher::new(model, store, 2, 64);
//!
//! // Per computed index value, on the consumer's hot path:
//! dispatcher.submit(request); // never blocks
//!
//! // On shutdown:
//! let stats = dispatcher.shutdown().await;
//! println!("insights generated: {}", stats.generated);
//! ```
//!
//! ## Failure Semantics
//!
//! Insight generation never gates an index computation. A full queue drops
//! the request, a timeout or schema violation is counted and logged, and a
//! persistence failure leaves the previous insight in place. Staleness is
//! visible to readers through each insight's timestamp.
//!
//! [`InsightRequest`]: aurindex_core::domain::InsightRequest

pub mod dispatcher;
pub mod error;
pub mod mock;
pub mod model;
pub mod openai;
pub mod parse;
pub mod prompt;

pub use async_openai::config::OpenAIConfig;
pub use dispatcher::{DispatcherStats, InsightDispatcher};
pub use error::InsightError;
pub use mock::MockInsightModel;
pub use model::InsightModel;
pub use openai::OpenAiInsightModel;
pub use parse::parse_insight_response;
pub use prompt::build_prompt;
