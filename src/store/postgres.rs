use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::model::{CatalogNode, HistoryRecord, Id, NodeKind, PriceTotals};
use crate::store::traits::{CatalogStore, CatalogTx};

const NODE_COLUMNS: &str = "id, name, kind, price, parent_id, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn node_from_row(row: &PgRow) -> Result<CatalogNode> {
    let kind: String = row.get("kind");
    let price: Option<i64> = row.get("price");
    Ok(CatalogNode {
        id: row.get("id"),
        name: row.get("name"),
        parent_id: row.get("parent_id"),
        kind: NodeKind::from_columns(&kind, price)?,
        updated_at: row.get("updated_at"),
    })
}

#[async_trait::async_trait]
impl CatalogStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(Box::new(PostgresTx { tx }))
    }

    async fn get_node(&self, id: Id) -> Result<Option<CatalogNode>> {
        let row = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM catalog_nodes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch node")?;

        row.as_ref().map(node_from_row).transpose()
    }

    async fn get_children(&self, parent_id: Id) -> Result<Vec<CatalogNode>> {
        let rows = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM catalog_nodes WHERE parent_id = $1 ORDER BY id"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch children")?;

        rows.iter().map(node_from_row).collect()
    }

    async fn history_in_window(
        &self,
        node_id: Id,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            "SELECT node_id, name, kind, price, parent_id, updated_at \
             FROM node_history \
             WHERE node_id = $1 AND updated_at >= $2 AND updated_at < $3 \
             ORDER BY seq",
        )
        .bind(node_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch history window")?;

        rows.iter()
            .map(|row| {
                let kind: String = row.get("kind");
                let price: Option<i64> = row.get("price");
                Ok(HistoryRecord {
                    node_id: row.get("node_id"),
                    name: row.get("name"),
                    parent_id: row.get("parent_id"),
                    kind: NodeKind::from_columns(&kind, price)?,
                    updated_at: row.get("updated_at"),
                })
            })
            .collect()
    }

    async fn offers_updated_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CatalogNode>> {
        let rows = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM catalog_nodes \
             WHERE kind = 'OFFER' AND updated_at >= $1 AND updated_at <= $2 \
             ORDER BY id"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch offers in sales window")?;

        rows.iter().map(node_from_row).collect()
    }
}

pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl CatalogTx for PostgresTx {
    async fn get_node(&mut self, id: Id) -> Result<Option<CatalogNode>> {
        let row = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM catalog_nodes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch node in transaction")?;

        row.as_ref().map(node_from_row).transpose()
    }

    async fn upsert_node(&mut self, node: &CatalogNode) -> Result<()> {
        sqlx::query(
            "INSERT INTO catalog_nodes (id, name, kind, price, parent_id, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 kind = EXCLUDED.kind, \
                 price = EXCLUDED.price, \
                 parent_id = EXCLUDED.parent_id, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(node.id)
        .bind(&node.name)
        .bind(node.kind.as_str())
        .bind(node.kind.price())
        .bind(node.parent_id)
        .bind(node.updated_at)
        .execute(&mut *self.tx)
        .await
        .context("Failed to upsert node")?;

        Ok(())
    }

    async fn delete_subtree(&mut self, id: Id) -> Result<()> {
        // parent_id carries ON DELETE CASCADE, so removing the root row
        // removes the whole subtree.
        sqlx::query("DELETE FROM catalog_nodes WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to delete subtree")?;

        Ok(())
    }

    async fn subtree_price_totals(&mut self, id: Id) -> Result<PriceTotals> {
        let row = sqlx::query(
            "WITH RECURSIVE subtree AS ( \
                 SELECT id FROM catalog_nodes WHERE id = $1 \
                 UNION ALL \
                 SELECT n.id FROM catalog_nodes n \
                 JOIN subtree s ON n.parent_id = s.id \
             ) \
             SELECT COALESCE(SUM(n.price), 0)::BIGINT AS total, COUNT(*)::BIGINT AS offers \
             FROM catalog_nodes n \
             JOIN subtree s ON n.id = s.id \
             WHERE n.kind = 'OFFER'",
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to compute subtree price totals")?;

        Ok(PriceTotals {
            sum: row.get("total"),
            offers: row.get("offers"),
        })
    }

    async fn append_history(&mut self, record: &HistoryRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO node_history (node_id, name, kind, price, parent_id, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.node_id)
        .bind(&record.name)
        .bind(record.kind.as_str())
        .bind(record.kind.price())
        .bind(record.parent_id)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await
        .context("Failed to append history record")?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.context("Failed to commit")?;
        Ok(())
    }
}
