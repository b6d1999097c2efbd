//! Valuation Engine
//!
//! Pure construction of a `PortfolioSnapshot` from folded holdings, capital
//! totals, and a per-symbol quote map. A holding whose price could not be
//! fetched is valued at its last-known quote (marked stale) or, with no
//! quote at all, at cost basis with an explicit `unavailable` marker —
//! never silently at zero, which would corrupt total P&L.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::entities::holding::{Holding, HoldingDetail, PortfolioSnapshot, PriceStatus};
use crate::domain::entities::quote::Quote;
use crate::domain::services::aggregator::CapitalTotals;

/// A quote paired with how fresh it is.
#[derive(Debug, Clone)]
pub struct ResolvedQuote {
    pub quote: Quote,
    pub status: PriceStatus,
}

/// Value one holding against the quote map.
pub fn value_holding(
    holding: &Holding,
    prices: &HashMap<String, ResolvedQuote>,
    total_capital: Decimal,
) -> HoldingDetail {
    let (current_price, price_status) = match prices.get(&holding.asset) {
        Some(resolved) => (resolved.quote.price, resolved.status),
        // No quote was ever obtained: carry the position at cost so its
        // P&L contribution is zero, and say so.
        None => (holding.average_price, PriceStatus::Unavailable),
    };

    let current_value = holding.amount * current_price;
    let pnl = current_value - holding.total_cost;
    let pnl_percent = if holding.total_cost.is_zero() {
        Decimal::ZERO
    } else {
        pnl / holding.total_cost * Decimal::ONE_HUNDRED
    };
    let percent_of_capital = if total_capital.is_zero() {
        Decimal::ZERO
    } else {
        current_value / total_capital * Decimal::ONE_HUNDRED
    };

    HoldingDetail {
        asset: holding.asset.clone(),
        amount: holding.amount,
        average_price: holding.average_price,
        current_price,
        total_cost: holding.total_cost,
        current_value,
        pnl,
        pnl_percent,
        percent_of_capital,
        price_status,
    }
}

/// Build the full snapshot.
pub fn build_snapshot(
    capital: &CapitalTotals,
    available_usdt: Decimal,
    holdings: &[Holding],
    prices: &HashMap<String, ResolvedQuote>,
) -> PortfolioSnapshot {
    let total_capital = capital.total_capital();

    let details: Vec<HoldingDetail> = holdings
        .iter()
        .map(|h| value_holding(h, prices, total_capital))
        .collect();

    let total_invested: Decimal = details.iter().map(|d| d.total_cost).sum();
    let current_value: Decimal = details.iter().map(|d| d.current_value).sum();
    let unrealized_pnl = current_value - total_invested;
    let total_pnl = unrealized_pnl - capital.realized_loss;
    let total_pnl_percent = if total_capital.is_zero() {
        Decimal::ZERO
    } else {
        total_pnl / total_capital * Decimal::ONE_HUNDRED
    };

    PortfolioSnapshot {
        total_capital,
        available_usdt,
        total_invested,
        current_value,
        unrealized_pnl,
        realized_loss: capital.realized_loss,
        total_pnl,
        total_pnl_percent,
        holdings: details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn holding(asset: &str, amount: Decimal, average_price: Decimal) -> Holding {
        Holding {
            asset: asset.to_string(),
            amount,
            average_price,
            total_cost: amount * average_price,
        }
    }

    fn live(symbol: &str, price: Decimal) -> (String, ResolvedQuote) {
        (
            symbol.to_string(),
            ResolvedQuote {
                quote: Quote::from_changes(
                    symbol,
                    price,
                    dec!(0),
                    dec!(0),
                    dec!(0),
                    dec!(0),
                ),
                status: PriceStatus::Live,
            },
        )
    }

    fn capital(deposits: Decimal, withdrawals: Decimal, realized_loss: Decimal) -> CapitalTotals {
        CapitalTotals {
            deposits,
            withdrawals,
            realized_loss,
        }
    }

    #[test]
    fn test_snapshot_aggregates() {
        let totals = capital(dec!(1000), dec!(0), dec!(0));
        let holdings = vec![holding("BTC", dec!(0.01), dec!(50000))];
        let prices: HashMap<_, _> = [live("BTC", dec!(60000))].into_iter().collect();

        let snap = build_snapshot(&totals, dec!(500), &holdings, &prices);
        assert_eq!(snap.total_capital, dec!(1000));
        assert_eq!(snap.available_usdt, dec!(500));
        assert_eq!(snap.total_invested, dec!(500));
        assert_eq!(snap.current_value, dec!(600.00));
        assert_eq!(snap.unrealized_pnl, dec!(100.00));
        assert_eq!(snap.total_pnl, dec!(100.00));
        assert_eq!(snap.total_pnl_percent, dec!(10));

        let btc = &snap.holdings[0];
        assert_eq!(btc.pnl_percent, dec!(20));
        assert_eq!(btc.percent_of_capital, dec!(60));
        assert_eq!(btc.price_status, PriceStatus::Live);
    }

    #[test]
    fn test_realized_loss_lowers_total_pnl_only() {
        let totals = capital(dec!(1000), dec!(0), dec!(300));
        let holdings = vec![holding("BTC", dec!(0.01), dec!(50000))];
        let prices: HashMap<_, _> = [live("BTC", dec!(50000))].into_iter().collect();

        let snap = build_snapshot(&totals, dec!(500), &holdings, &prices);
        assert_eq!(snap.total_capital, dec!(1300));
        assert_eq!(snap.realized_loss, dec!(300));
        assert_eq!(snap.unrealized_pnl, dec!(0.00));
        assert_eq!(snap.total_pnl, dec!(-300.00));
    }

    #[test]
    fn test_missing_price_values_at_cost_with_marker() {
        let totals = capital(dec!(1000), dec!(0), dec!(0));
        let holdings = vec![holding("OBSCURE", dec!(10), dec!(2))];
        let prices = HashMap::new();

        let snap = build_snapshot(&totals, dec!(980), &holdings, &prices);
        let h = &snap.holdings[0];
        assert_eq!(h.price_status, PriceStatus::Unavailable);
        assert_eq!(h.current_price, dec!(2));
        assert_eq!(h.current_value, dec!(20));
        assert_eq!(h.pnl, dec!(0));
        // The missing quote must not drag the portfolio total to zero.
        assert_eq!(snap.current_value, dec!(20));
        assert_eq!(snap.unrealized_pnl, dec!(0));
    }

    #[test]
    fn test_stale_quote_is_marked() {
        let totals = capital(dec!(100), dec!(0), dec!(0));
        let holdings = vec![holding("BTC", dec!(0.001), dec!(50000))];
        let mut prices: HashMap<_, _> = [live("BTC", dec!(55000))].into_iter().collect();
        prices.get_mut("BTC").unwrap().status = PriceStatus::Stale;

        let snap = build_snapshot(&totals, dec!(50), &holdings, &prices);
        assert_eq!(snap.holdings[0].price_status, PriceStatus::Stale);
        assert_eq!(snap.holdings[0].current_price, dec!(55000));
    }

    #[test]
    fn test_zero_capital_and_cost_guard_division() {
        let totals = capital(dec!(0), dec!(0), dec!(0));
        let holdings = vec![Holding {
            asset: "BTC".to_string(),
            amount: dec!(1),
            average_price: dec!(0),
            total_cost: dec!(0),
        }];
        let prices: HashMap<_, _> = [live("BTC", dec!(100))].into_iter().collect();

        let snap = build_snapshot(&totals, dec!(0), &holdings, &prices);
        assert_eq!(snap.holdings[0].pnl_percent, dec!(0));
        assert_eq!(snap.holdings[0].percent_of_capital, dec!(0));
        assert_eq!(snap.total_pnl_percent, dec!(0));
    }
}
