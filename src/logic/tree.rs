use std::collections::HashMap;

use crate::logic::{CatalogError, CatalogResult};
use crate::model::{Id, NodeTree};
use crate::store::traits::CatalogStore;

/// Nested view of a node and all of its descendants.
pub struct SubtreeQuery;

impl SubtreeQuery {
    /// Walk the subtree breadth-first, then reattach every node to its
    /// declared parent. Offers carry `children: None`; categories always
    /// carry a list, empty when childless.
    pub async fn fetch<S: CatalogStore + ?Sized>(store: &S, id: Id) -> CatalogResult<NodeTree> {
        let root = store.get_node(id).await?.ok_or(CatalogError::NotFound)?;

        let mut nodes = vec![root];
        let mut cursor = 0;
        while cursor < nodes.len() {
            if nodes[cursor].kind.is_category() {
                let children = store.get_children(nodes[cursor].id).await?;
                nodes.extend(children);
            }
            cursor += 1;
        }

        // Reverse BFS order guarantees a node's children are assembled
        // before the node itself.
        let mut children_of: HashMap<Id, Vec<NodeTree>> = HashMap::new();
        for node in nodes.iter().rev() {
            let children = if node.kind.is_category() {
                Some(children_of.remove(&node.id).unwrap_or_default())
            } else {
                None
            };
            let tree = NodeTree::from_node(node, children);
            if node.id == id {
                return Ok(tree);
            }
            if let Some(parent_id) = node.parent_id {
                children_of.entry(parent_id).or_default().push(tree);
            }
        }

        // Unreachable: the queried node is always first in BFS order.
        Err(CatalogError::NotFound)
    }
}
