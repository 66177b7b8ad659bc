//! Seams between the orchestrator and its network-facing collaborators

use async_trait::async_trait;

use crate::error::HarvestError;
use crate::models::{ProductCard, ProductSummary};

/// Source of product summaries: paginated discovery plus by-identifier
/// lookup for store-driven runs.
#[async_trait]
pub trait SummarySource: Send + Sync {
    /// Next listing page. An empty page signals exhaustion; re-invoking
    /// after that restarts pagination from the configured start page.
    async fn next_page(&mut self) -> Result<Vec<ProductSummary>, HarvestError>;

    /// Full summary for one identifier, via the detail endpoint.
    async fn summary(&self, id: i64) -> Result<ProductSummary, HarvestError>;
}

/// Source of rich per-product card data.
#[async_trait]
pub trait CardSource: Send + Sync {
    async fn fetch_card(&self, id: i64) -> Result<ProductCard, HarvestError>;
}
