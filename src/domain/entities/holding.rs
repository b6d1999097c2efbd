use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current position in one asset, derived by folding the order ledger.
///
/// Never persisted as authoritative state: a `Holding` only exists as the
/// output of a fold evaluated at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub asset: String,
    pub amount: Decimal,
    pub average_price: Decimal,
    pub total_cost: Decimal,
}

/// Freshness of the price used to value a holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceStatus {
    /// Quote fetched live for this snapshot.
    Live,
    /// Feed failed; last-known cached quote used.
    Stale,
    /// No quote was ever obtained; position valued at cost basis.
    Unavailable,
}

/// A holding valued against a market price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingDetail {
    pub asset: String,
    pub amount: Decimal,
    pub average_price: Decimal,
    pub current_price: Decimal,
    pub total_cost: Decimal,
    pub current_value: Decimal,
    pub pnl: Decimal,
    pub pnl_percent: Decimal,
    pub percent_of_capital: Decimal,
    pub price_status: PriceStatus,
}

/// Fully derived portfolio read-model: capital totals, valued holdings,
/// and aggregate P&L. Recomputed fresh from the ledgers on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_capital: Decimal,
    pub available_usdt: Decimal,
    pub total_invested: Decimal,
    pub current_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_loss: Decimal,
    pub total_pnl: Decimal,
    pub total_pnl_percent: Decimal,
    pub holdings: Vec<HoldingDetail>,
}
