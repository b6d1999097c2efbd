use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::errors::PortfolioError;

/// A strictly positive decimal magnitude.
///
/// Every amount that enters a ledger passes through here, so malformed or
/// non-positive input is rejected before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PortfolioError> {
        if value <= Decimal::ZERO {
            return Err(PortfolioError::Validation(format!(
                "Amount must be positive, got {}",
                value
            )));
        }
        Ok(Amount(value))
    }

    /// Parse from the string form used on the wire.
    pub fn parse(s: &str) -> Result<Self, PortfolioError> {
        let value = Decimal::from_str(s)
            .map_err(|_| PortfolioError::Validation(format!("Invalid amount: {:?}", s)))?;
        Amount::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_positive() {
        let a = Amount::new(dec!(0.00000001)).unwrap();
        assert_eq!(a.value(), dec!(0.00000001));
    }

    #[test]
    fn test_amount_rejects_zero_and_negative() {
        assert!(Amount::new(Decimal::ZERO).is_err());
        assert!(Amount::new(dec!(-1)).is_err());
    }

    #[test]
    fn test_amount_parse() {
        assert_eq!(Amount::parse("1500.25").unwrap().value(), dec!(1500.25));
        assert!(Amount::parse("abc").is_err());
        assert!(Amount::parse("-3").is_err());
        assert!(Amount::parse("0").is_err());
    }
}
