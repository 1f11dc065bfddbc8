use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CatalogNode, Id, NodeKind};

/// Immutable snapshot of a node taken on every commit that touches it, either
/// its own edit or a propagated price recompute. Appended in commit order and
/// never rewritten; snapshots outlive the node they describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub node_id: Id,
    pub name: String,
    pub parent_id: Option<Id>,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub updated_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn snapshot(node: &CatalogNode) -> Self {
        Self {
            node_id: node.id,
            name: node.name.clone(),
            parent_id: node.parent_id,
            kind: node.kind,
            updated_at: node.updated_at,
        }
    }
}
