use crate::logic::propagate::PricePropagator;
use crate::logic::{CatalogError, CatalogResult};
use crate::model::Id;
use crate::store::traits::CatalogStore;

/// Remove a node and its whole subtree, then recompute the former parent's
/// chain in the same transaction. Timestamps of surviving ancestors are left
/// untouched: a delete has no batch timestamp of its own.
pub async fn delete_node<S: CatalogStore + ?Sized>(store: &S, id: Id) -> CatalogResult<()> {
    let mut tx = store.begin().await?;
    let node = tx.get_node(id).await?.ok_or(CatalogError::NotFound)?;

    tx.delete_subtree(id).await?;
    if let Some(parent_id) = node.parent_id {
        PricePropagator::climb(tx.as_mut(), parent_id, None).await?;
    }

    tx.commit().await?;
    Ok(())
}
