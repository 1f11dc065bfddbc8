use chrono::{DateTime, Duration, Utc};

use crate::logic::{CatalogError, CatalogResult};
use crate::model::{CatalogNode, HistoryRecord, Id};
use crate::store::traits::CatalogStore;

/// Snapshots of one node over the half-open interval `[start, end)`.
///
/// An empty result set is reported as NotFound, which deliberately collapses
/// "node never existed" and "no activity in this window" into one signal; the
/// boundary treats it as a 404, not a structural error.
pub async fn node_statistic<S: CatalogStore + ?Sized>(
    store: &S,
    node_id: Id,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CatalogResult<Vec<HistoryRecord>> {
    let records = store.history_in_window(node_id, start, end).await?;
    if records.is_empty() {
        return Err(CatalogError::NotFound);
    }
    Ok(records)
}

/// Offers whose own `updated_at` falls in the closed 24-hour window ending at
/// `date`. Pure read; triggers no propagation.
pub async fn sales_window<S: CatalogStore + ?Sized>(
    store: &S,
    date: DateTime<Utc>,
) -> CatalogResult<Vec<CatalogNode>> {
    let start = date - Duration::hours(24);
    Ok(store.offers_updated_in_window(start, date).await?)
}
