//! Persistence Layer
//!
//! SQLite storage for the two append-only ledgers (capitals, orders) and the
//! watchlist, with async access via sqlx.
//!
//! There is deliberately no `holdings` table: holdings are a derived view
//! folded from the order ledger at read time, never a stored row that
//! mutations could drift away from.
//!
//! # Schema
//!
//! ## capitals
//! - id: monotonic rowid
//! - amount: TEXT decimal magnitude (always positive; `type` carries sign semantics)
//! - type: 'initial' | 'dca' | 'withdraw' | 'realized_loss'
//! - description: optional text
//! - created_at: timestamp
//!
//! ## orders
//! - id: monotonic rowid
//! - asset: symbol (e.g. "BTC")
//! - type: 'buy' | 'sell'
//! - amount, price, total_usdt: TEXT decimals (total_usdt = amount × price, kept for audit)
//! - is_custom_price: whether the price was user-supplied instead of fetched
//! - created_at: timestamp
//!
//! ## watchlist
//! - symbol: primary key
//! - name: optional display name
//! - added_at: timestamp
//!
//! Decimal columns are stored as TEXT and parsed with `rust_decimal` on
//! read so no precision is lost to floating point.

pub mod models;
pub mod repository;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database initialization and access error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Initialize the database connection pool and run migrations.
///
/// # Arguments
/// - `database_url`: SQLite URL (e.g., "sqlite://data/hodlbook.db")
///
/// # Errors
/// Returns error if the connection or migrations fail.
pub async fn init_database(database_url: &str) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", database_url);

    // Ensure data directory exists
    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .log_statements(tracing::log::LevelFilter::Debug);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized");

    Ok(pool)
}

/// Run database migrations
async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS capitals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount TEXT NOT NULL,
            type TEXT NOT NULL CHECK(type IN ('initial', 'dca', 'withdraw', 'realized_loss')),
            description TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create capitals table: {}", e))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            asset TEXT NOT NULL,
            type TEXT NOT NULL CHECK(type IN ('buy', 'sell')),
            amount TEXT NOT NULL,
            price TEXT NOT NULL,
            total_usdt TEXT NOT NULL,
            is_custom_price BOOLEAN NOT NULL DEFAULT FALSE,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create orders table: {}", e)))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watchlist (
            symbol TEXT PRIMARY KEY,
            name TEXT,
            added_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create watchlist table: {}", e))
    })?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_capitals_type ON capitals(type)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_asset ON orders(asset)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at)")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    info!("Database migrations completed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_init() {
        let pool = init_database("sqlite::memory:").await;
        assert!(pool.is_ok());
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = init_database("sqlite::memory:").await.unwrap();

        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('capitals', 'orders', 'watchlist')"
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(result.0, 3);
    }
}
