//! # Aurindex Core
//!
//! Core contracts and domain types for the Aurindex composite-index pipeline.
//!
//! ## Overview
//!
//! This crate provides the foundational components for Aurindex:
//!
//! - **Canonical domain models** for price observations, index definitions,
//!   computed values, and generated insights
//! - **Price cache** holding the latest observation per symbol
//! - **Index calculator** with the level-normalized and return-based methods
//! - **Persistence trait** every storage backend implements
//! - **Transport trait** plus wire-message parsing for inbound price streams
//!
//! ## Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `default` | Standard feature set |
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Last-observation-wins price cache |
//! | [`calculator`] | Weighted composite-index computation |
//! | [`domain`] | Domain models (PriceObservation, IndexConfig, IndexResult) |
//! | [`error`] | Core error types |
//! | [`store`] | Persistence contract and in-memory reference store |
//! | [`transport`] | Inbound stream contract and message parsing |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aurindex_core::{parse_price_message, IndexCalculator, IndexConfig, PriceCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = PriceCache::new();
//!     let config = IndexConfig::default_commodity_crypto();
//!     let calculator = IndexCalculator::new(&config)?;
//!
//!     // One message from the wire feeds the cache...
//!     let observation = parse_price_message(message_bytes)?;
//!     cache.update(observation).await;
//!
//!     // ...and a per-index snapshot feeds the calculator.
//!     let prices = cache.snapshot(config.symbols()).await;
//!     if calculator.validate(&prices).is_ok() {
//!         println!("{} = {:.2}", config.name, calculator.compute_level_normalized(&prices));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ Price Source    │
//! │ (stream trait)  │
//! └────────┬────────┘
//!          │ raw message
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Consumer Loop   │────▶│ Price Cache      │
//! │ (service crate) │     │ (per-symbol)     │
//! └────────┬────────┘     └──────────────────┘
//!          │ snapshot
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Index           │────▶│ Index Store      │
//! │ Calculator      │     │ (persistence)    │
//! └────────┬────────┘     └──────────────────┘
//!          │ result
//!          ▼
//! ┌─────────────────┐
//! │ Insight         │
//! │ Dispatcher      │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result` types with structured errors:
//!
//! ```rust
//! use aurindex_core::{StoreError, StoreErrorKind};
//!
//! fn handle_error(error: StoreError) {
//!     match error.kind() {
//!         StoreErrorKind::Unavailable | StoreErrorKind::WriteFailed => {
//!             // Retryable: back off and try again
//!         }
//!         StoreErrorKind::InvalidData => {
//!             // Report to user
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - Credentials for external collaborators are read from environment
//!   variables only (never logged)
//! - Input validation on all domain types

pub mod cache;
pub mod calculator;
pub mod domain;
pub mod error;
pub mod store;
pub mod transport;

// Re-export commonly used types at crate root for convenience

// Caching
pub use cache::PriceCache;

// Calculation
pub use calculator::{IndexCalculator, ValidationFailure};

// Domain models
pub use domain::{
    AuditPayload, IndexConfig, IndexMethod, IndexResult, InsightRequest, InsightResponse,
    PriceObservation, PricePoint, Sentiment, Symbol, UtcDateTime, MAX_SUMMARY_LEN,
    WEIGHT_SUM_TOLERANCE,
};

// Error types
pub use error::{CoreError, ValidationError};

// Persistence contract
pub use store::{IndexStore, InsightRecord, MemoryStore, StoreError, StoreErrorKind};

// Transport contract
pub use transport::{parse_price_message, ChannelSource, PriceSource, TransportError};
