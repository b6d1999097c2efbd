//! Holdings Aggregator
//!
//! Pure folds over the two append-only ledgers. Nothing here touches I/O or
//! holds state: per-asset positions, weighted-average cost, and capital
//! totals are recomputed from ledger history on every read, so there is no
//! stored "current holding" that could drift.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::domain::entities::capital::{CapitalEntry, CapitalKind};
use crate::domain::entities::holding::Holding;
use crate::domain::entities::order::{Order, OrderSide};

/// Capital ledger totals.
///
/// `realized_loss` raises `total_capital` (it is capital the user lost
/// before this ledger existed) but never enters `available_usdt` — the
/// split between capital accounting and spendable cash is the most
/// error-prone invariant in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapitalTotals {
    pub deposits: Decimal,
    pub withdrawals: Decimal,
    pub realized_loss: Decimal,
}

impl CapitalTotals {
    /// Net capital ever made available to the strategy.
    pub fn total_capital(&self) -> Decimal {
        self.deposits - self.withdrawals + self.realized_loss
    }
}

/// Fold the capital ledger into its totals.
pub fn fold_capital(entries: &[CapitalEntry]) -> CapitalTotals {
    let mut totals = CapitalTotals {
        deposits: Decimal::ZERO,
        withdrawals: Decimal::ZERO,
        realized_loss: Decimal::ZERO,
    };
    for entry in entries {
        match entry.kind {
            CapitalKind::Initial | CapitalKind::Dca => totals.deposits += entry.amount,
            CapitalKind::Withdraw => totals.withdrawals += entry.amount,
            CapitalKind::RealizedLoss => totals.realized_loss += entry.amount,
        }
    }
    totals
}

/// Net cash flow from trading: sell proceeds minus buy spend.
pub fn order_cash_flow(orders: &[Order]) -> Decimal {
    orders.iter().fold(Decimal::ZERO, |acc, order| match order.side {
        OrderSide::Buy => acc - order.total_usdt,
        OrderSide::Sell => acc + order.total_usdt,
    })
}

/// Spendable cash: deposits minus withdrawals, adjusted by trading flow.
/// Realized-loss entries do not participate.
pub fn available_usdt(capital: &CapitalTotals, orders: &[Order]) -> Decimal {
    capital.deposits - capital.withdrawals + order_cash_flow(orders)
}

/// Fold the order ledger into current per-asset positions.
///
/// Orders must be in ledger order (ascending `created_at`, then id) —
/// average cost depends on the sequence. Buy: cost basis grows by the
/// order's cash total and the average is re-blended. Sell: cost basis is
/// removed proportionally at the pre-sell average; the per-unit average is
/// unchanged (weighted-average method, no lot tracking). A position that
/// reaches exactly zero drops its cost basis entirely, so a later buy
/// starts a fresh average.
///
/// Only open positions (amount > 0) are returned, sorted by asset.
pub fn fold_holdings(orders: &[Order]) -> Vec<Holding> {
    #[derive(Default)]
    struct Position {
        amount: Decimal,
        total_cost: Decimal,
    }

    let mut positions: BTreeMap<&str, Position> = BTreeMap::new();

    for order in orders {
        let pos = positions.entry(order.asset.as_str()).or_default();
        match order.side {
            OrderSide::Buy => {
                pos.amount += order.amount;
                pos.total_cost += order.total_usdt;
            }
            OrderSide::Sell => {
                if pos.amount > Decimal::ZERO {
                    pos.total_cost -= pos.total_cost * order.amount / pos.amount;
                }
                pos.amount -= order.amount;
                if pos.amount.is_zero() {
                    pos.total_cost = Decimal::ZERO;
                }
            }
        }
    }

    positions
        .into_iter()
        .filter(|(_, pos)| pos.amount > Decimal::ZERO)
        .map(|(asset, pos)| Holding {
            asset: asset.to_string(),
            average_price: pos.total_cost / pos.amount,
            amount: pos.amount,
            total_cost: pos.total_cost,
        })
        .collect()
}

/// Amount of one asset currently held after folding the given orders.
pub fn held_amount(orders: &[Order], asset: &str) -> Decimal {
    orders
        .iter()
        .filter(|o| o.asset == asset)
        .fold(Decimal::ZERO, |acc, o| match o.side {
            OrderSide::Buy => acc + o.amount,
            OrderSide::Sell => acc - o.amount,
        })
}

/// Re-validate an order sequence as if it were replayed from an empty book.
///
/// Used before deleting an order: the remaining sequence must keep every
/// sell's "sufficient position" precondition satisfied. Returns the id of
/// the first violating order.
pub fn validate_replay(orders: &[Order]) -> Result<(), i64> {
    let mut held: BTreeMap<&str, Decimal> = BTreeMap::new();
    for order in orders {
        let amount = held.entry(order.asset.as_str()).or_insert(Decimal::ZERO);
        match order.side {
            OrderSide::Buy => *amount += order.amount,
            OrderSide::Sell => {
                if order.amount > *amount {
                    return Err(order.id);
                }
                *amount -= order.amount;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn entry(id: i64, amount: Decimal, kind: CapitalKind) -> CapitalEntry {
        CapitalEntry {
            id,
            amount,
            kind,
            description: None,
            created_at: Utc::now(),
        }
    }

    fn order(id: i64, asset: &str, side: OrderSide, amount: Decimal, price: Decimal) -> Order {
        Order {
            id,
            asset: asset.to_string(),
            side,
            amount,
            price,
            total_usdt: amount * price,
            is_custom_price: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fold_capital_totals() {
        let entries = vec![
            entry(1, dec!(1000), CapitalKind::Initial),
            entry(2, dec!(500), CapitalKind::Dca),
            entry(3, dec!(200), CapitalKind::Withdraw),
            entry(4, dec!(300), CapitalKind::RealizedLoss),
        ];
        let totals = fold_capital(&entries);
        assert_eq!(totals.deposits, dec!(1500));
        assert_eq!(totals.withdrawals, dec!(200));
        assert_eq!(totals.realized_loss, dec!(300));
        assert_eq!(totals.total_capital(), dec!(1600));
    }

    #[test]
    fn test_realized_loss_never_touches_available_cash() {
        let entries = vec![
            entry(1, dec!(1000), CapitalKind::Initial),
            entry(2, dec!(300), CapitalKind::RealizedLoss),
        ];
        let totals = fold_capital(&entries);
        // Raises total capital by the same magnitude it will lower total
        // P&L, but spendable cash is untouched.
        assert_eq!(totals.total_capital(), dec!(1300));
        assert_eq!(available_usdt(&totals, &[]), dec!(1000));
    }

    #[test]
    fn test_available_usdt_includes_trading_flow() {
        let entries = vec![entry(1, dec!(1000), CapitalKind::Initial)];
        let totals = fold_capital(&entries);
        let orders = vec![
            order(1, "BTC", OrderSide::Buy, dec!(0.01), dec!(50000)),
            order(2, "BTC", OrderSide::Sell, dec!(0.005), dec!(60000)),
        ];
        // 1000 - 500 + 300
        assert_eq!(available_usdt(&totals, &orders), dec!(800));
    }

    #[test]
    fn test_buy_blends_average_price() {
        let orders = vec![
            order(1, "BTC", OrderSide::Buy, dec!(1), dec!(100)),
            order(2, "BTC", OrderSide::Buy, dec!(1), dec!(200)),
        ];
        let holdings = fold_holdings(&orders);
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].amount, dec!(2));
        assert_eq!(holdings[0].total_cost, dec!(300));
        assert_eq!(holdings[0].average_price, dec!(150));
    }

    #[test]
    fn test_sell_keeps_average_price() {
        let orders = vec![
            order(1, "BTC", OrderSide::Buy, dec!(0.01), dec!(50000)),
            order(2, "BTC", OrderSide::Sell, dec!(0.005), dec!(60000)),
        ];
        let holdings = fold_holdings(&orders);
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].amount, dec!(0.005));
        assert_eq!(holdings[0].average_price, dec!(50000));
        assert_eq!(holdings[0].total_cost, dec!(250));
    }

    #[test]
    fn test_sell_to_zero_resets_cost_basis() {
        let orders = vec![
            order(1, "ETH", OrderSide::Buy, dec!(2), dec!(3000)),
            order(2, "ETH", OrderSide::Sell, dec!(2), dec!(3500)),
        ];
        assert!(fold_holdings(&orders).is_empty());

        // A later buy starts a fresh average, not a blend with stale cost.
        let mut orders = orders;
        orders.push(order(3, "ETH", OrderSide::Buy, dec!(1), dec!(4000)));
        let holdings = fold_holdings(&orders);
        assert_eq!(holdings[0].amount, dec!(1));
        assert_eq!(holdings[0].average_price, dec!(4000));
    }

    #[test]
    fn test_sell_then_buy_back_restores_average() {
        let orders = vec![
            order(1, "BTC", OrderSide::Buy, dec!(2), dec!(100)),
            order(2, "BTC", OrderSide::Sell, dec!(1), dec!(150)),
            order(3, "BTC", OrderSide::Buy, dec!(1), dec!(100)),
        ];
        let holdings = fold_holdings(&orders);
        assert_eq!(holdings[0].amount, dec!(2));
        assert_eq!(holdings[0].average_price, dec!(100));
    }

    #[test]
    fn test_fold_holdings_many_small_dca_buys_stay_exact() {
        // 0.001 at 61234.56, a thousand times: decimal math must not drift.
        let orders: Vec<Order> = (0..1000)
            .map(|i| order(i, "BTC", OrderSide::Buy, dec!(0.001), dec!(61234.56)))
            .collect();
        let holdings = fold_holdings(&orders);
        assert_eq!(holdings[0].amount, dec!(1.000));
        assert_eq!(holdings[0].total_cost, dec!(61234.56000));
        assert_eq!(holdings[0].average_price, dec!(61234.56));
    }

    #[test]
    fn test_held_amount_per_asset() {
        let orders = vec![
            order(1, "BTC", OrderSide::Buy, dec!(0.5), dec!(100)),
            order(2, "ETH", OrderSide::Buy, dec!(3), dec!(10)),
            order(3, "BTC", OrderSide::Sell, dec!(0.2), dec!(100)),
        ];
        assert_eq!(held_amount(&orders, "BTC"), dec!(0.3));
        assert_eq!(held_amount(&orders, "ETH"), dec!(3));
        assert_eq!(held_amount(&orders, "SOL"), Decimal::ZERO);
    }

    #[test]
    fn test_validate_replay_detects_overdraw() {
        let good = vec![
            order(1, "BTC", OrderSide::Buy, dec!(1), dec!(100)),
            order(2, "BTC", OrderSide::Sell, dec!(1), dec!(100)),
        ];
        assert!(validate_replay(&good).is_ok());

        // Removing the buy leaves the sell unbacked.
        let broken = vec![order(2, "BTC", OrderSide::Sell, dec!(1), dec!(100))];
        assert_eq!(validate_replay(&broken), Err(2));
    }
}
