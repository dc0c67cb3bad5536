//! # Domain Models
//!
//! Canonical domain types for the aurindex pipeline.
//!
//! ## Overview
//!
//! This module provides strongly-typed domain models with built-in validation.
//! All models are designed to be:
//!
//! - **Type-safe**: Invalid states are unrepresentable
//! - **Validated**: Construction validates all invariants
//! - **Serializable**: Full serde support for JSON
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated asset symbol |
//! | [`UtcDateTime`] | UTC timestamp |
//! | [`PriceObservation`] | One inbound price update |
//! | [`IndexConfig`] | Basket weights, base prices, base level |
//! | [`IndexMethod`] | Computation method selector |
//! | [`IndexResult`] | One computed index value with audit payload |
//! | [`InsightRequest`] | Input to the insight collaborator |
//! | [`InsightResponse`] | Structured insight output |
//!
//! ## Validation
//!
//! Domain types enforce invariants at construction time:
//!
//! ```rust,ignore
//! use aurindex_core::{IndexConfig, ValidationError};
//! use indexmap::IndexMap;
//!
//! // Weights must sum to 1.0 within tolerance
//! let invalid = IndexConfig::new("BAD", 1000.0, lopsided_weights, bases, "2024-01-01");
//! assert!(matches!(invalid, Err(ValidationError::WeightSumMismatch { .. })));
//! ```
//!
//! ## Ordering
//!
//! `IndexConfig` keeps its weight and base-price maps in declared symbol
//! order; validation reports the first violation in that order, so error
//! messages are reproducible across runs.

mod index;
mod insight;
mod price;
mod symbol;
mod timestamp;

pub use index::{
    AuditPayload, IndexConfig, IndexMethod, IndexResult, WEIGHT_SUM_TOLERANCE,
};
pub use insight::{
    InsightRequest, InsightResponse, PricePoint, Sentiment, MAX_SUMMARY_LEN,
};
pub use price::{validate_positive, PriceObservation};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
