pub mod delete;
pub mod import;
pub mod propagate;
pub mod stats;
pub mod tree;
pub mod validate;

pub use delete::delete_node;
pub use import::BatchImporter;
pub use propagate::PricePropagator;
pub use stats::{node_statistic, sales_window};
pub use tree::SubtreeQuery;

/// Failure taxonomy of the core. Validation failures abort the enclosing
/// transaction with no partial writes; NotFound is an expected outcome the
/// boundary maps to its own signal; Storage wraps adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("item not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
