use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = Uuid;

/// Closed two-variant tag for catalog nodes. An offer always carries a
/// concrete price; a category price is derived by the propagation engine and
/// is absent while the subtree holds no offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Offer { price: i64 },
    Category { price: Option<i64> },
}

impl NodeKind {
    pub fn is_category(&self) -> bool {
        matches!(self, NodeKind::Category { .. })
    }

    pub fn price(&self) -> Option<i64> {
        match self {
            NodeKind::Offer { price } => Some(*price),
            NodeKind::Category { price } => *price,
        }
    }

    /// Storage tag, matches the CHECK constraint in the migration.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Offer { .. } => "OFFER",
            NodeKind::Category { .. } => "CATEGORY",
        }
    }

    /// Rebuild the tagged union from a (kind, price) column pair.
    pub fn from_columns(kind: &str, price: Option<i64>) -> anyhow::Result<Self> {
        match kind {
            "OFFER" => price
                .map(|price| NodeKind::Offer { price })
                .ok_or_else(|| anyhow::anyhow!("OFFER row is missing a price")),
            "CATEGORY" => Ok(NodeKind::Category { price }),
            other => Err(anyhow::anyhow!("unknown node kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogNode {
    pub id: Id,
    pub name: String,
    pub parent_id: Option<Id>,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate over every offer in a subtree, root inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceTotals {
    pub sum: i64,
    pub offers: i64,
}

impl PriceTotals {
    /// Floor-divided average, or `None` when the subtree has no offers.
    pub fn average(&self) -> Option<i64> {
        if self.offers == 0 {
            None
        } else {
            Some(self.sum / self.offers)
        }
    }
}

/// Nested subtree view. Offers carry no children marker at all; a childless
/// category carries an empty list, which is a different shape on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeTree {
    pub id: Id,
    pub name: String,
    pub parent_id: Option<Id>,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub updated_at: DateTime<Utc>,
    pub children: Option<Vec<NodeTree>>,
}

impl NodeTree {
    pub fn from_node(node: &CatalogNode, children: Option<Vec<NodeTree>>) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
            parent_id: node.parent_id,
            kind: node.kind,
            updated_at: node.updated_at,
            children,
        }
    }
}
