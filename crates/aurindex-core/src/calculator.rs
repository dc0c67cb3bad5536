//! Weighted composite-index computation.
//!
//! Two interchangeable methods produce an index value from a price snapshot:
//!
//! | Method | Inputs | Rounding |
//! |--------|--------|----------|
//! | level-normalized | current prices vs. base prices | 2 decimals |
//! | return-based | previous and current prices, previous level | 4 decimals |
//!
//! The rounding precisions differ on purpose and must stay as they are;
//! downstream consumers compare stored values digit for digit.
//!
//! Only [`IndexCalculator::validate`] gates a computation. The compute
//! methods themselves skip symbols with missing or unusable inputs silently,
//! so a partial-coverage snapshot still yields a value.

use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;

use crate::{IndexConfig, Symbol, ValidationError};

/// Why a price snapshot was rejected for an index cycle.
///
/// Carries the first violation found, checked in the basket's declared
/// symbol order so messages are reproducible.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationFailure {
    #[error("no price data provided")]
    NoPriceData,
    #[error("missing price for {symbol}")]
    MissingSymbol { symbol: Symbol },
    #[error("invalid price for {symbol}: {price}")]
    InvalidPrice { symbol: Symbol, price: f64 },
}

/// Pure computation engine for one configured index.
#[derive(Debug, Clone)]
pub struct IndexCalculator {
    weights: IndexMap<Symbol, f64>,
    base_prices: IndexMap<Symbol, f64>,
    base_level: f64,
}

impl IndexCalculator {
    /// Build a calculator from a validated index definition.
    ///
    /// Re-runs the config invariants, so a calculator can never exist for
    /// weights that do not sum to 1.0 within tolerance.
    pub fn new(config: &IndexConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            weights: config.weights.clone(),
            base_prices: config.base_prices.clone(),
            base_level: config.base_level,
        })
    }

    /// Gate for the streaming path: every basket symbol must be present with
    /// a positive price. Reports the first violation in declared order.
    pub fn validate(&self, prices: &HashMap<Symbol, f64>) -> Result<(), ValidationFailure> {
        if prices.is_empty() {
            return Err(ValidationFailure::NoPriceData);
        }

        for symbol in self.weights.keys() {
            match prices.get(symbol) {
                None => {
                    return Err(ValidationFailure::MissingSymbol {
                        symbol: symbol.clone(),
                    })
                }
                Some(&price) if price <= 0.0 => {
                    return Err(ValidationFailure::InvalidPrice {
                        symbol: symbol.clone(),
                        price,
                    })
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Level-normalized value: each symbol contributes its price relative to
    /// the base price, weighted, scaled by the base level.
    ///
    /// Symbols with a zero weight, a missing price, or a missing/non-positive
    /// base price are skipped silently.
    pub fn compute_level_normalized(&self, prices: &HashMap<Symbol, f64>) -> f64 {
        let mut score = 0.0;
        for (symbol, &weight) in &self.weights {
            if weight == 0.0 {
                continue;
            }
            let Some(&price) = prices.get(symbol) else {
                continue;
            };
            let Some(&base) = self.base_prices.get(symbol) else {
                continue;
            };
            if base <= 0.0 {
                continue;
            }
            score += (price / base) * weight;
        }

        round_dp(score * self.base_level, 2)
    }

    /// Return-based value: weighted period returns compounded onto a previous
    /// index level. Symbols missing from either map, or with a non-positive
    /// previous price, are skipped silently.
    pub fn compute_return_index(
        &self,
        prev_prices: &HashMap<Symbol, f64>,
        cur_prices: &HashMap<Symbol, f64>,
        prev_index_level: f64,
    ) -> f64 {
        let mut weighted_return = 0.0;
        for (symbol, &weight) in &self.weights {
            let (Some(&prev), Some(&cur)) = (prev_prices.get(symbol), cur_prices.get(symbol))
            else {
                continue;
            };
            if prev <= 0.0 {
                continue;
            }
            weighted_return += ((cur - prev) / prev) * weight;
        }

        round_dp(prev_index_level * (1.0 + weighted_return), 4)
    }

    /// 24-hour percentage change between two index levels.
    ///
    /// Returns 0.0 when the past level is non-positive; an empty or broken
    /// history must never turn into a division error.
    pub fn compute_delta_24h(current: f64, past: f64) -> f64 {
        if past <= 0.0 {
            return 0.0;
        }
        round_dp(((current - past) / past) * 100.0, 2)
    }

    pub fn base_level(&self) -> f64 {
        self.base_level
    }

    pub fn weights(&self) -> &IndexMap<Symbol, f64> {
        &self.weights
    }

    pub fn base_prices(&self) -> &IndexMap<Symbol, f64> {
        &self.base_prices
    }
}

fn round_dp(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
