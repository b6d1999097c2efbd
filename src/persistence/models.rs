//! Database Models
//!
//! Row types for the two ledgers and the watchlist. Decimal columns are TEXT
//! in SQLite; conversion into domain entities parses them and fails loudly
//! on corrupt rows rather than defaulting to zero.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use super::DatabaseError;
use crate::domain::entities::capital::{CapitalEntry, CapitalKind};
use crate::domain::entities::order::{Order, OrderSide};
use crate::domain::entities::watchlist::WatchlistItem;

/// Capital ledger row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CapitalRecord {
    pub id: i64,
    pub amount: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CapitalRecord {
    pub fn into_entry(self) -> Result<CapitalEntry, DatabaseError> {
        let amount = parse_decimal("capitals.amount", self.id, &self.amount)?;
        let kind = CapitalKind::parse(&self.kind).ok_or_else(|| {
            DatabaseError::CorruptRow(format!(
                "capitals row {}: unknown type {:?}",
                self.id, self.kind
            ))
        })?;
        Ok(CapitalEntry {
            id: self.id,
            amount,
            kind,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

/// Order ledger row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub asset: String,
    #[sqlx(rename = "type")]
    pub side: String,
    pub amount: String,
    pub price: String,
    pub total_usdt: String,
    pub is_custom_price: bool,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn into_order(self) -> Result<Order, DatabaseError> {
        let amount = parse_decimal("orders.amount", self.id, &self.amount)?;
        let price = parse_decimal("orders.price", self.id, &self.price)?;
        let total_usdt = parse_decimal("orders.total_usdt", self.id, &self.total_usdt)?;
        let side = OrderSide::parse(&self.side).ok_or_else(|| {
            DatabaseError::CorruptRow(format!(
                "orders row {}: unknown type {:?}",
                self.id, self.side
            ))
        })?;
        Ok(Order {
            id: self.id,
            asset: self.asset,
            side,
            amount,
            price,
            total_usdt,
            is_custom_price: self.is_custom_price,
            created_at: self.created_at,
        })
    }
}

/// Watchlist row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WatchlistRecord {
    pub symbol: String,
    pub name: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl From<WatchlistRecord> for WatchlistItem {
    fn from(r: WatchlistRecord) -> Self {
        WatchlistItem {
            symbol: r.symbol,
            name: r.name,
            added_at: r.added_at,
        }
    }
}

/// Create capital entry input
#[derive(Debug, Clone)]
pub struct CreateCapital {
    pub amount: Decimal,
    pub kind: CapitalKind,
    pub description: Option<String>,
}

/// Create order input
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub asset: String,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub total_usdt: Decimal,
    pub is_custom_price: bool,
}

fn parse_decimal(column: &str, id: i64, raw: &str) -> Result<Decimal, DatabaseError> {
    Decimal::from_str(raw).map_err(|e| {
        DatabaseError::CorruptRow(format!("{} row {}: {:?} is not a decimal: {}", column, id, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_capital_record_into_entry() {
        let record = CapitalRecord {
            id: 7,
            amount: "1000.50".to_string(),
            kind: "dca".to_string(),
            description: None,
            created_at: Utc::now(),
        };
        let entry = record.into_entry().unwrap();
        assert_eq!(entry.amount, dec!(1000.50));
        assert_eq!(entry.kind, CapitalKind::Dca);
    }

    #[test]
    fn test_capital_record_corrupt_amount() {
        let record = CapitalRecord {
            id: 7,
            amount: "not-a-number".to_string(),
            kind: "dca".to_string(),
            description: None,
            created_at: Utc::now(),
        };
        assert!(matches!(
            record.into_entry(),
            Err(DatabaseError::CorruptRow(_))
        ));
    }

    #[test]
    fn test_order_record_into_order() {
        let record = OrderRecord {
            id: 1,
            asset: "BTC".to_string(),
            side: "buy".to_string(),
            amount: "0.01".to_string(),
            price: "50000".to_string(),
            total_usdt: "500".to_string(),
            is_custom_price: false,
            created_at: Utc::now(),
        };
        let order = record.into_order().unwrap();
        assert_eq!(order.amount, dec!(0.01));
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.total_usdt, dec!(500));
    }
}
