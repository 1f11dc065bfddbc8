use chrono::{DateTime, Utc};
use itertools::Itertools;
use uuid::Uuid;

use crate::logic::{CatalogError, CatalogResult};
use crate::model::{Id, ImportItem, NodeKind};

/// An import item with identifiers parsed and the price/kind rules enforced
/// by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedItem {
    pub id: Id,
    pub parent_id: Option<Id>,
    pub name: String,
    pub kind: NodeKind,
}

pub fn parse_node_id(raw: &str) -> CatalogResult<Id> {
    Uuid::parse_str(raw)
        .map_err(|_| CatalogError::validation(format!("'{}' does not match the UUID format", raw)))
}

pub fn parse_timestamp(raw: &str) -> CatalogResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|_| {
            CatalogError::validation(format!("'{}' is not an ISO 8601 timestamp", raw))
        })
}

/// Validate a whole batch up front, before any transaction is opened.
pub fn validate_items(items: &[ImportItem]) -> CatalogResult<Vec<ValidatedItem>> {
    if let Some(duplicate) = items.iter().map(|item| &item.id).duplicates().next() {
        return Err(CatalogError::validation(format!(
            "duplicate id '{}' within one batch",
            duplicate
        )));
    }
    items.iter().map(validate_item).collect()
}

fn validate_item(item: &ImportItem) -> CatalogResult<ValidatedItem> {
    let id = parse_node_id(&item.id)?;
    let parent_id = item.parent_id.as_deref().map(parse_node_id).transpose()?;

    if item.name.is_empty() {
        return Err(CatalogError::validation("field 'name' must be non-empty"));
    }

    let kind = match item.kind.as_str() {
        "OFFER" => match item.price {
            Some(price) if price >= 0 => NodeKind::Offer { price },
            Some(_) => {
                return Err(CatalogError::validation(
                    "price must be greater than or equal to zero",
                ))
            }
            None => {
                return Err(CatalogError::validation(
                    "field 'price' cannot be empty for OFFER",
                ))
            }
        },
        "CATEGORY" => {
            if item.price.is_some() {
                return Err(CatalogError::validation(
                    "field 'price' must be empty for CATEGORY",
                ));
            }
            NodeKind::Category { price: None }
        }
        other => {
            return Err(CatalogError::validation(format!(
                "unknown node type '{}'",
                other
            )))
        }
    };

    Ok(ValidatedItem {
        id,
        parent_id,
        name: item.name.clone(),
        kind,
    })
}
