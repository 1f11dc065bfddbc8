use chrono::{DateTime, Utc};

use crate::model::{CatalogNode, HistoryRecord, Id, PriceTotals};
use anyhow::Result;

/// Storage adapter consumed by the core. Reads that never mutate run directly
/// on the store; import and delete obtain a [`CatalogTx`] so that node
/// commits, propagation and history appends land atomically.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Open a transaction scope. Dropping the handle without calling
    /// [`CatalogTx::commit`] rolls every staged write back.
    async fn begin(&self) -> Result<Box<dyn CatalogTx>>;

    async fn get_node(&self, id: Id) -> Result<Option<CatalogNode>>;
    async fn get_children(&self, parent_id: Id) -> Result<Vec<CatalogNode>>;

    /// Snapshots for one node with `start <= updated_at < end`, in insertion
    /// order.
    async fn history_in_window(
        &self,
        node_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryRecord>>;

    /// Offers whose own `updated_at` lies in the closed interval
    /// `[start, end]`.
    async fn offers_updated_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CatalogNode>>;
}

#[async_trait::async_trait]
pub trait CatalogTx: Send {
    async fn get_node(&mut self, id: Id) -> Result<Option<CatalogNode>>;

    /// Insert or fully replace one node row.
    async fn upsert_node(&mut self, node: &CatalogNode) -> Result<()>;

    /// Remove a node and every descendant. History rows are left in place.
    async fn delete_subtree(&mut self, id: Id) -> Result<()>;

    /// Sum and count of offer prices over the whole subtree rooted at `id`,
    /// root inclusive.
    async fn subtree_price_totals(&mut self, id: Id) -> Result<PriceTotals>;

    async fn append_history(&mut self, record: &HistoryRecord) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
