use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market quote for one symbol as supplied by the price feed.
///
/// Absolute change figures are derived from the percentages so the wire
/// shape matches what the ticker UI renders directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub change_1h: Decimal,
    pub percent_change_1h: Decimal,
    pub change_24h: Decimal,
    pub percent_change_24h: Decimal,
    pub change_7d: Decimal,
    pub percent_change_7d: Decimal,
    pub change_30d: Decimal,
    pub percent_change_30d: Decimal,
}

impl Quote {
    /// Build a quote from a price and the four percent-change figures.
    pub fn from_changes(
        symbol: &str,
        price: Decimal,
        pct_1h: Decimal,
        pct_24h: Decimal,
        pct_7d: Decimal,
        pct_30d: Decimal,
    ) -> Self {
        let hundred = Decimal::ONE_HUNDRED;
        Quote {
            symbol: symbol.to_string(),
            price,
            change_1h: price * pct_1h / hundred,
            percent_change_1h: pct_1h,
            change_24h: price * pct_24h / hundred,
            percent_change_24h: pct_24h,
            change_7d: price * pct_7d / hundred,
            percent_change_7d: pct_7d,
            change_30d: price * pct_30d / hundred,
            percent_change_30d: pct_30d,
        }
    }
}

/// One entry of the top-coins listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinInfo {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_changes_derives_absolute_moves() {
        let q = Quote::from_changes(
            "BTC",
            dec!(100),
            dec!(1),
            dec!(2),
            dec!(5),
            dec!(-10),
        );
        assert_eq!(q.change_1h, dec!(1));
        assert_eq!(q.change_24h, dec!(2));
        assert_eq!(q.change_7d, dec!(5));
        assert_eq!(q.change_30d, dec!(-10));
        assert_eq!(q.percent_change_30d, dec!(-10));
    }
}
