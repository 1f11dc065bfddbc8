use std::collections::{HashMap, HashSet, VecDeque};

use crate::logic::propagate::PricePropagator;
use crate::logic::validate::{self, ValidatedItem};
use crate::logic::{CatalogError, CatalogResult};
use crate::model::{CatalogNode, HistoryRecord, Id, ImportRequest};
use crate::store::traits::{CatalogStore, CatalogTx};

/// Batch import resolver: validates an unordered batch of upserts, resolves
/// forward references to parents appearing later in the same batch, commits
/// every node inside one transaction and triggers price propagation once per
/// distinct nearest affected category.
pub struct BatchImporter;

impl BatchImporter {
    pub async fn run<S: CatalogStore + ?Sized>(
        store: &S,
        request: ImportRequest,
    ) -> CatalogResult<()> {
        let update_date = validate::parse_timestamp(&request.update_date)?;
        let items = validate::validate_items(&request.items)?;
        let order = topological_order(&items)?;

        let mut tx = store.begin().await?;

        // Nearest affected categories, in first-queued order. When a queued
        // start's direct parent is queued as well, the parent entry is
        // dropped: the climb from the child recomputes it anyway.
        let mut starts: Vec<Id> = Vec::new();
        let mut queued: HashSet<Id> = HashSet::new();
        // Former parents of re-parented nodes; their chain must be recomputed
        // too, or the detached branch keeps a stale price.
        let mut detached: Vec<Id> = Vec::new();

        for index in order {
            let item = &items[index];

            let parent = match item.parent_id {
                Some(parent_id) => {
                    let parent = tx.get_node(parent_id).await?.ok_or_else(|| {
                        CatalogError::validation(format!(
                            "parent '{}' not found",
                            parent_id
                        ))
                    })?;
                    if !parent.kind.is_category() {
                        return Err(CatalogError::validation("parent type cannot be OFFER"));
                    }
                    Some(parent)
                }
                None => None,
            };

            if let Some(previous) = tx.get_node(item.id).await? {
                if previous.kind.is_category() != item.kind.is_category() {
                    return Err(CatalogError::validation(
                        "type of an existing node cannot be changed",
                    ));
                }
                if previous.parent_id != item.parent_id {
                    if let Some(new_parent) = item.parent_id {
                        ensure_not_own_descendant(tx.as_mut(), item.id, new_parent).await?;
                    }
                    if let Some(old_parent) = previous.parent_id {
                        detached.push(old_parent);
                    }
                }
            }

            let node = CatalogNode {
                id: item.id,
                name: item.name.clone(),
                parent_id: item.parent_id,
                kind: item.kind,
                updated_at: update_date,
            };
            tx.upsert_node(&node).await?;
            if !node.kind.is_category() {
                // Offers are never touched by propagation, so their snapshot
                // is taken here; categories are snapshotted on recompute.
                tx.append_history(&HistoryRecord::snapshot(&node)).await?;
            }

            let (start, start_parent) = if node.kind.is_category() {
                (Some(node.id), node.parent_id)
            } else {
                (node.parent_id, parent.as_ref().and_then(|p| p.parent_id))
            };
            if let Some(start) = start {
                if queued.insert(start) {
                    starts.push(start);
                }
                if let Some(covered) = start_parent {
                    if queued.remove(&covered) {
                        starts.retain(|&queued_start| queued_start != covered);
                    }
                }
            }
        }

        for start in &starts {
            PricePropagator::climb(tx.as_mut(), *start, Some(update_date)).await?;
        }
        for start in detached {
            if queued.insert(start) {
                PricePropagator::climb(tx.as_mut(), start, Some(update_date)).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// A re-parented node must not move under its own subtree, or the parent
/// relation stops being a forest and every subtree walk diverges. The chain
/// from the new parent upward is inspected against the transaction state, so
/// edges committed earlier in the same batch count; the walk is bounded
/// because the stored tree is still acyclic when each item is applied.
async fn ensure_not_own_descendant(
    tx: &mut dyn CatalogTx,
    id: Id,
    new_parent: Id,
) -> CatalogResult<()> {
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == id {
            return Err(CatalogError::validation(format!(
                "node '{}' cannot be re-parented under its own descendant",
                id
            )));
        }
        cursor = match tx.get_node(current).await? {
            Some(node) => node.parent_id,
            None => None,
        };
    }
    Ok(())
}

/// Bounded topological sort over in-batch parent references. Items whose
/// parents are already persisted (or absent) come out first; anything left
/// blocked after the sweep is a parent cycle among unpersisted items,
/// self-references included.
fn topological_order(items: &[ValidatedItem]) -> CatalogResult<Vec<usize>> {
    let index: HashMap<Id, usize> = items
        .iter()
        .enumerate()
        .map(|(position, item)| (item.id, position))
        .collect();

    let mut blocked = vec![0usize; items.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    for (position, item) in items.iter().enumerate() {
        if let Some(parent_id) = item.parent_id {
            if let Some(&parent_position) = index.get(&parent_id) {
                blocked[position] += 1;
                dependents[parent_position].push(position);
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..items.len()).filter(|&i| blocked[i] == 0).collect();
    let mut order = Vec::with_capacity(items.len());
    while let Some(position) = ready.pop_front() {
        order.push(position);
        for &dependent in &dependents[position] {
            blocked[dependent] -= 1;
            if blocked[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    if order.len() != items.len() {
        return Err(CatalogError::validation(
            "parent references form a cycle within the batch",
        ));
    }
    Ok(order)
}
