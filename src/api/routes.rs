use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::store::traits::CatalogStore;

pub fn create_router<S: CatalogStore + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Batched upserts; all-or-nothing
        .route("/imports", post(handlers::imports::<S>))
        // Cascading delete of a subtree
        .route("/delete/:id", delete(handlers::delete_node::<S>))
        // Nested subtree view
        .route("/nodes/:id", get(handlers::get_nodes::<S>))
        // Offers updated in the 24h window ending at ?date=
        .route("/sales", get(handlers::sales::<S>))
        // History snapshots over [dateStart, dateEnd)
        .route("/node/:id/statistic", get(handlers::node_statistic::<S>))
}
