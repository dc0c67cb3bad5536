use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::price::validate_positive;
use crate::{Symbol, UtcDateTime, ValidationError};

/// Allowed deviation of a weight map's sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// Computation method for a composite index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMethod {
    LevelNormalized,
    ReturnBased,
}

impl IndexMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LevelNormalized => "level_normalized",
            Self::ReturnBased => "return_based",
        }
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input {
            "level_normalized" => Ok(Self::LevelNormalized),
            "return_based" => Ok(Self::ReturnBased),
            other => Err(ValidationError::InvalidMethod {
                value: other.to_owned(),
            }),
        }
    }
}

impl Display for IndexMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of one composite index: basket weights, base prices at index
/// origin, and the base level the index was normalized to on `base_date`.
///
/// The weight and base-price maps preserve their declared symbol order, and
/// every iteration over them (validation, computation, audit payloads)
/// follows that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    pub base_level: f64,
    pub weights: IndexMap<Symbol, f64>,
    pub base_prices: IndexMap<Symbol, f64>,
    pub base_date: String,
}

impl IndexConfig {
    pub fn new(
        name: impl Into<String>,
        base_level: f64,
        weights: IndexMap<Symbol, f64>,
        base_prices: IndexMap<Symbol, f64>,
        base_date: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let config = Self {
            name: name.into(),
            base_level,
            weights,
            base_prices,
            base_date: base_date.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every construction invariant. Deserialized configs must pass
    /// through here before use.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        validate_positive("base_level", self.base_level)?;

        if self.weights.is_empty() {
            return Err(ValidationError::EmptyWeights);
        }
        for weight in self.weights.values() {
            if !weight.is_finite() {
                return Err(ValidationError::NonFiniteValue { field: "weights" });
            }
        }
        let sum = self.weight_sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ValidationError::WeightSumMismatch {
                sum,
                tolerance: WEIGHT_SUM_TOLERANCE,
            });
        }

        for (symbol, &base) in &self.base_prices {
            if !base.is_finite() || base <= 0.0 {
                return Err(ValidationError::NonPositiveBasePrice {
                    symbol: symbol.to_string(),
                    value: base,
                });
            }
        }

        Ok(())
    }

    pub fn weight_sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Basket symbols in declared order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.weights.keys()
    }

    /// The canonical commodity/crypto basket used as a seed when no index
    /// definitions are configured.
    pub fn default_commodity_crypto() -> Self {
        let weights = IndexMap::from([
            (Symbol::parse("GOLD").expect("symbol"), 0.25),
            (Symbol::parse("SILVER").expect("symbol"), 0.25),
            (Symbol::parse("OIL").expect("symbol"), 0.20),
            (Symbol::parse("BTC").expect("symbol"), 0.15),
            (Symbol::parse("ETH").expect("symbol"), 0.15),
        ]);
        let base_prices = IndexMap::from([
            (Symbol::parse("GOLD").expect("symbol"), 1800.0),
            (Symbol::parse("SILVER").expect("symbol"), 23.0),
            (Symbol::parse("OIL").expect("symbol"), 75.0),
            (Symbol::parse("BTC").expect("symbol"), 20000.0),
            (Symbol::parse("ETH").expect("symbol"), 1000.0),
        ]);
        Self::new("GSOC", 1000.0, weights, base_prices, "2024-01-01")
            .expect("default basket weights sum to 1.0")
    }
}

/// Inputs captured alongside each computed value so a stored result can be
/// audited without replaying the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPayload {
    pub prices: IndexMap<Symbol, f64>,
    pub weights: IndexMap<Symbol, f64>,
    pub base_prices: IndexMap<Symbol, f64>,
}

/// One computed index value, written once per successful computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResult {
    pub index_name: String,
    pub index_value: f64,
    pub timestamp: UtcDateTime,
    pub method: IndexMethod,
    pub delta_24h_pct: Option<f64>,
    pub payload: AuditPayload,
}

impl IndexResult {
    pub fn new(
        index_name: impl Into<String>,
        index_value: f64,
        timestamp: UtcDateTime,
        method: IndexMethod,
        delta_24h_pct: Option<f64>,
        payload: AuditPayload,
    ) -> Result<Self, ValidationError> {
        let index_name = index_name.into();
        if index_name.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "index_name" });
        }
        if !index_value.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "index_value",
            });
        }
        if let Some(delta) = delta_24h_pct {
            if !delta.is_finite() {
                return Err(ValidationError::NonFiniteValue {
                    field: "delta_24h_pct",
                });
            }
        }

        Ok(Self {
            index_name,
            index_value,
            timestamp,
            method,
            delta_24h_pct,
            payload,
        })
    }
}
