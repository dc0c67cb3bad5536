use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// A single normalized price update for one asset symbol.
///
/// Immutable once constructed; the cache replaces whole observations,
/// it never patches fields in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: Symbol,
    pub price: f64,
    pub unit: String,
    pub observed_at: UtcDateTime,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl PriceObservation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        price: f64,
        unit: impl Into<String>,
        observed_at: UtcDateTime,
        source: impl Into<String>,
        source_id: Option<String>,
        confidence: f64,
    ) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;

        let unit = unit.into();
        if unit.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "unit" });
        }

        let source = source.into();
        if source.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "source" });
        }

        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::ConfidenceOutOfRange { value: confidence });
        }

        Ok(Self {
            symbol,
            price,
            unit,
            observed_at,
            source,
            source_id,
            confidence,
        })
    }
}

/// Validate that a value is finite and strictly positive.
pub fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}
