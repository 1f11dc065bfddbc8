use chrono::{DateTime, Utc};

use crate::logic::CatalogResult;
use crate::model::{HistoryRecord, Id, NodeKind};
use crate::store::traits::CatalogTx;

/// Push-based incremental aggregate over the tree: every change to a subtree
/// is propagated eagerly to the root, so reading a category price is O(1).
pub struct PricePropagator;

impl PricePropagator {
    /// Recompute the derived price of `start` and of every strict ancestor,
    /// walking upward until a node without a parent is reached. Each
    /// recomputed category is persisted and snapshotted into the history log.
    ///
    /// When `update_date` is given (imports), recomputed nodes are stamped
    /// with it; deletes pass `None` and leave timestamps untouched.
    pub async fn climb(
        tx: &mut dyn CatalogTx,
        start: Id,
        update_date: Option<DateTime<Utc>>,
    ) -> CatalogResult<()> {
        let mut current = tx.get_node(start).await?;
        while let Some(mut node) = current {
            if node.kind.is_category() {
                let totals = tx.subtree_price_totals(node.id).await?;
                node.kind = NodeKind::Category {
                    price: totals.average(),
                };
                if let Some(date) = update_date {
                    node.updated_at = date;
                }
                tx.upsert_node(&node).await?;
                tx.append_history(&HistoryRecord::snapshot(&node)).await?;
            }
            current = match node.parent_id {
                Some(parent_id) => tx.get_node(parent_id).await?,
                None => None,
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CatalogNode;
    use crate::store::memory::MemoryStore;
    use crate::store::traits::CatalogStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn category(id: Uuid, parent_id: Option<Uuid>) -> CatalogNode {
        CatalogNode {
            id,
            name: format!("category-{}", id),
            parent_id,
            kind: NodeKind::Category { price: None },
            updated_at: Utc::now(),
        }
    }

    fn offer(id: Uuid, parent_id: Uuid, price: i64) -> CatalogNode {
        CatalogNode {
            id,
            name: format!("offer-{}", id),
            parent_id: Some(parent_id),
            kind: NodeKind::Offer { price },
            updated_at: Utc::now(),
        }
    }

    async fn seed(store: &MemoryStore, nodes: &[CatalogNode]) {
        let mut tx = store.begin().await.unwrap();
        for node in nodes {
            tx.upsert_node(node).await.unwrap();
        }
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn floor_divided_average_reaches_every_ancestor() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();
        let mid = Uuid::new_v4();
        seed(
            &store,
            &[
                category(root, None),
                category(mid, Some(root)),
                offer(Uuid::new_v4(), mid, 79999),
                offer(Uuid::new_v4(), mid, 59999),
            ],
        )
        .await;

        let mut tx = store.begin().await.unwrap();
        PricePropagator::climb(tx.as_mut(), mid, None).await.unwrap();
        tx.commit().await.unwrap();

        let mid_node = store.get_node(mid).await.unwrap().unwrap();
        let root_node = store.get_node(root).await.unwrap().unwrap();
        assert_eq!(mid_node.kind.price(), Some(69999));
        assert_eq!(root_node.kind.price(), Some(69999));
    }

    #[tokio::test]
    async fn average_uses_floor_division() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();
        seed(
            &store,
            &[
                category(root, None),
                offer(Uuid::new_v4(), root, 100),
                offer(Uuid::new_v4(), root, 101),
                offer(Uuid::new_v4(), root, 103),
            ],
        )
        .await;

        let mut tx = store.begin().await.unwrap();
        PricePropagator::climb(tx.as_mut(), root, None).await.unwrap();
        tx.commit().await.unwrap();

        // 304 / 3 floors to 101
        let node = store.get_node(root).await.unwrap().unwrap();
        assert_eq!(node.kind.price(), Some(101));
    }

    #[tokio::test]
    async fn category_without_offers_has_no_price() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();
        let empty = Uuid::new_v4();
        seed(&store, &[category(root, None), category(empty, Some(root))]).await;

        let mut tx = store.begin().await.unwrap();
        PricePropagator::climb(tx.as_mut(), empty, None).await.unwrap();
        tx.commit().await.unwrap();

        let node = store.get_node(empty).await.unwrap().unwrap();
        assert_eq!(node.kind.price(), None);
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();
        seed(
            &store,
            &[category(root, None), offer(Uuid::new_v4(), root, 42)],
        )
        .await;

        let mut tx = store.begin().await.unwrap();
        PricePropagator::climb(tx.as_mut(), root, None).await.unwrap();
        PricePropagator::climb(tx.as_mut(), root, None).await.unwrap();
        tx.commit().await.unwrap();

        let node = store.get_node(root).await.unwrap().unwrap();
        assert_eq!(node.kind.price(), Some(42));
    }

    #[tokio::test]
    async fn every_recompute_is_snapshotted() {
        let store = MemoryStore::new();
        let root = Uuid::new_v4();
        let stamp = "2022-02-03T12:00:00Z".parse().unwrap();
        seed(
            &store,
            &[category(root, None), offer(Uuid::new_v4(), root, 42)],
        )
        .await;

        let mut tx = store.begin().await.unwrap();
        PricePropagator::climb(tx.as_mut(), root, Some(stamp)).await.unwrap();
        tx.commit().await.unwrap();

        let records = store
            .history_in_window(root, stamp, Utc::now())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind.price(), Some(42));
        assert_eq!(records[0].updated_at, stamp);
    }
}
