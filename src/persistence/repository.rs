//! Database Repository
//!
//! Data access for the capital ledger, the order ledger, and the watchlist.
//! Ledgers are append-only: rows are inserted, listed, and (after replay
//! validation upstream) deleted, never updated.

use super::models::*;
use super::{DatabaseError, DbPool};
use chrono::Utc;
use tracing::{debug, error};

/// Capital ledger repository
#[derive(Clone)]
pub struct CapitalRepository {
    pool: DbPool,
}

impl CapitalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append a capital entry.
    pub async fn create(&self, entry: CreateCapital) -> Result<CapitalRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, CapitalRecord>(
            r#"
            INSERT INTO capitals (amount, type, description, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(entry.amount.to_string())
        .bind(entry.kind.as_str())
        .bind(&entry.description)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create capital entry: {}", e);
            DatabaseError::QueryError(format!("Failed to create capital entry: {}", e))
        })?;

        debug!("Created capital entry {} ({})", record.id, record.kind);
        Ok(record)
    }

    /// Get one entry by id.
    pub async fn get(&self, id: i64) -> Result<Option<CapitalRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, CapitalRecord>("SELECT * FROM capitals WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get capital entry {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to get capital entry: {}", e))
            })?;

        Ok(record)
    }

    /// Delete one entry; returns false when the id does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM capitals WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete capital entry {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to delete capital entry: {}", e))
            })?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    /// All entries in ledger order (ascending id) for folding.
    pub async fn list_asc(&self) -> Result<Vec<CapitalRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, CapitalRecord>(
            "SELECT * FROM capitals ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list capital entries: {}", e);
            DatabaseError::QueryError(format!("Failed to list capital entries: {}", e))
        })?;

        Ok(records)
    }

    /// All entries newest-first for history views.
    pub async fn list_desc(&self) -> Result<Vec<CapitalRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, CapitalRecord>(
            "SELECT * FROM capitals ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list capital entries: {}", e);
            DatabaseError::QueryError(format!("Failed to list capital entries: {}", e))
        })?;

        Ok(records)
    }

    /// Remove every entry. Destructive; used by the full reset only.
    pub async fn delete_all(&self) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM capitals")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to clear capitals: {}", e);
                DatabaseError::QueryError(format!("Failed to clear capitals: {}", e))
            })?;
        Ok(())
    }
}

/// Order ledger repository
#[derive(Clone)]
pub struct OrderRepository {
    pool: DbPool,
}

impl OrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append an order.
    pub async fn create(&self, order: CreateOrder) -> Result<OrderRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, OrderRecord>(
            r#"
            INSERT INTO orders (asset, type, amount, price, total_usdt, is_custom_price, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING *
            "#,
        )
        .bind(&order.asset)
        .bind(order.side.as_str())
        .bind(order.amount.to_string())
        .bind(order.price.to_string())
        .bind(order.total_usdt.to_string())
        .bind(order.is_custom_price)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create order: {}", e);
            DatabaseError::QueryError(format!("Failed to create order: {}", e))
        })?;

        debug!(
            "Created order {} ({} {} {})",
            record.id, record.side, record.amount, record.asset
        );
        Ok(record)
    }

    /// Get one order by id.
    pub async fn get(&self, id: i64) -> Result<Option<OrderRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, OrderRecord>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get order {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to get order: {}", e))
            })?;

        Ok(record)
    }

    /// Delete one order; returns false when the id does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete order {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to delete order: {}", e))
            })?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    /// All orders in ledger order (ascending) for folding. Average-cost math
    /// depends on this ordering, keyed by timestamp then monotonic id.
    pub async fn list_asc(&self) -> Result<Vec<OrderRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, OrderRecord>(
            "SELECT * FROM orders ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list orders: {}", e);
            DatabaseError::QueryError(format!("Failed to list orders: {}", e))
        })?;

        Ok(records)
    }

    /// All orders newest-first for history views.
    pub async fn list_desc(&self) -> Result<Vec<OrderRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, OrderRecord>(
            "SELECT * FROM orders ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list orders: {}", e);
            DatabaseError::QueryError(format!("Failed to list orders: {}", e))
        })?;

        Ok(records)
    }

    /// Orders for one asset, newest-first.
    pub async fn list_by_asset_desc(&self, asset: &str) -> Result<Vec<OrderRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, OrderRecord>(
            "SELECT * FROM orders WHERE asset = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(asset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list orders for {}: {}", asset, e);
            DatabaseError::QueryError(format!("Failed to list orders: {}", e))
        })?;

        Ok(records)
    }

    /// Remove every order. Destructive; used by the full reset only.
    pub async fn delete_all(&self) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM orders")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to clear orders: {}", e);
                DatabaseError::QueryError(format!("Failed to clear orders: {}", e))
            })?;
        Ok(())
    }
}

/// Watchlist repository
#[derive(Clone)]
pub struct WatchlistRepository {
    pool: DbPool,
}

impl WatchlistRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Add or rename a watched symbol.
    pub async fn upsert(
        &self,
        symbol: &str,
        name: Option<&str>,
    ) -> Result<WatchlistRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, WatchlistRecord>(
            r#"
            INSERT INTO watchlist (symbol, name, added_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (symbol) DO UPDATE SET name = ?2
            RETURNING *
            "#,
        )
        .bind(symbol)
        .bind(name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to upsert watchlist entry {}: {}", symbol, e);
            DatabaseError::QueryError(format!("Failed to upsert watchlist entry: {}", e))
        })?;

        Ok(record)
    }

    /// Remove a watched symbol; returns false when it was not present.
    pub async fn delete(&self, symbol: &str) -> Result<bool, DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM watchlist WHERE symbol = ?1")
            .bind(symbol)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete watchlist entry {}: {}", symbol, e);
                DatabaseError::QueryError(format!("Failed to delete watchlist entry: {}", e))
            })?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    /// All watched symbols, newest-first.
    pub async fn list(&self) -> Result<Vec<WatchlistRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, WatchlistRecord>(
            "SELECT * FROM watchlist ORDER BY added_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list watchlist: {}", e);
            DatabaseError::QueryError(format!("Failed to list watchlist: {}", e))
        })?;

        Ok(records)
    }

    /// Remove every watched symbol. Used by the full reset only.
    pub async fn delete_all(&self) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM watchlist")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to clear watchlist: {}", e);
                DatabaseError::QueryError(format!("Failed to clear watchlist: {}", e))
            })?;
        Ok(())
    }
}
