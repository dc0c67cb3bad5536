//! Model abstraction for insight generation.

use async_trait::async_trait;
use aurindex_core::domain::{InsightRequest, InsightResponse};

use crate::error::InsightError;

/// A model that turns an index computation into a market insight.
///
/// Implementations are expected to be cheap to share (`Arc<dyn InsightModel>`)
/// and to enforce their own deadlines: a call that can hang forever would stall
/// a dispatcher worker.
#[async_trait]
pub trait InsightModel: Send + Sync {
    /// Human-readable model identifier for logs, e.g. `"gpt-4o-mini"`.
    fn name(&self) -> &str;

    /// Generate an insight for one computed index value.
    async fn generate(&self, request: &InsightRequest) -> Result<InsightResponse, InsightError>;
}
