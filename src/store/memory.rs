use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::model::{CatalogNode, HistoryRecord, Id, NodeKind, PriceTotals};
use crate::store::traits::{CatalogStore, CatalogTx};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    nodes: BTreeMap<Id, CatalogNode>,
    history: Vec<HistoryRecord>,
}

impl MemoryState {
    fn subtree_ids(&self, root: Id) -> Vec<Id> {
        let mut ids = Vec::new();
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            ids.push(id);
            pending.extend(
                self.nodes
                    .values()
                    .filter(|node| node.parent_id == Some(id))
                    .map(|node| node.id),
            );
        }
        ids
    }
}

/// In-memory catalog store used by the test suite. A transaction stages a
/// clone of the full state and swaps it in on commit, so commits are atomic
/// and an abandoned handle leaves the store untouched. Concurrent overlapping
/// transactions are last-write-wins, which the single-threaded tests never
/// exercise.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>> {
        let staged = self.state.lock().clone();
        Ok(Box::new(MemoryTx {
            shared: Arc::clone(&self.state),
            staged,
        }))
    }

    async fn get_node(&self, id: Id) -> Result<Option<CatalogNode>> {
        Ok(self.state.lock().nodes.get(&id).cloned())
    }

    async fn get_children(&self, parent_id: Id) -> Result<Vec<CatalogNode>> {
        Ok(self
            .state
            .lock()
            .nodes
            .values()
            .filter(|node| node.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn history_in_window(
        &self,
        node_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryRecord>> {
        Ok(self
            .state
            .lock()
            .history
            .iter()
            .filter(|record| {
                record.node_id == node_id && record.updated_at >= start && record.updated_at < end
            })
            .cloned()
            .collect())
    }

    async fn offers_updated_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CatalogNode>> {
        Ok(self
            .state
            .lock()
            .nodes
            .values()
            .filter(|node| {
                !node.kind.is_category() && node.updated_at >= start && node.updated_at <= end
            })
            .cloned()
            .collect())
    }
}

struct MemoryTx {
    shared: Arc<Mutex<MemoryState>>,
    staged: MemoryState,
}

#[async_trait::async_trait]
impl CatalogTx for MemoryTx {
    async fn get_node(&mut self, id: Id) -> Result<Option<CatalogNode>> {
        Ok(self.staged.nodes.get(&id).cloned())
    }

    async fn upsert_node(&mut self, node: &CatalogNode) -> Result<()> {
        self.staged.nodes.insert(node.id, node.clone());
        Ok(())
    }

    async fn delete_subtree(&mut self, id: Id) -> Result<()> {
        for id in self.staged.subtree_ids(id) {
            self.staged.nodes.remove(&id);
        }
        Ok(())
    }

    async fn subtree_price_totals(&mut self, id: Id) -> Result<PriceTotals> {
        let mut totals = PriceTotals::default();
        for id in self.staged.subtree_ids(id) {
            if let Some(node) = self.staged.nodes.get(&id) {
                if let NodeKind::Offer { price } = node.kind {
                    totals.sum += price;
                    totals.offers += 1;
                }
            }
        }
        Ok(totals)
    }

    async fn append_history(&mut self, record: &HistoryRecord) -> Result<()> {
        self.staged.history.push(record.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        *self.shared.lock() = self.staged;
        Ok(())
    }
}
