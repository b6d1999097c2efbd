use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of a capital ledger entry.
///
/// `Initial` and `Dca` add spendable cash, `Withdraw` removes it.
/// `RealizedLoss` is a capital-accounting adjustment for money lost before
/// this ledger existed: it raises total capital and lowers total P&L but
/// never touches spendable cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalKind {
    Initial,
    Dca,
    Withdraw,
    RealizedLoss,
}

impl CapitalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapitalKind::Initial => "initial",
            CapitalKind::Dca => "dca",
            CapitalKind::Withdraw => "withdraw",
            CapitalKind::RealizedLoss => "realized_loss",
        }
    }

    pub fn parse(s: &str) -> Option<CapitalKind> {
        match s {
            "initial" => Some(CapitalKind::Initial),
            "dca" => Some(CapitalKind::Dca),
            "withdraw" => Some(CapitalKind::Withdraw),
            "realized_loss" => Some(CapitalKind::RealizedLoss),
            _ => None,
        }
    }

    /// True for kinds the user may not delete once recorded.
    pub fn is_protected(&self) -> bool {
        matches!(self, CapitalKind::Withdraw | CapitalKind::RealizedLoss)
    }
}

impl std::fmt::Display for CapitalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable entry in the capital ledger.
///
/// `amount` is always a positive magnitude; the kind determines its sign
/// semantics in the fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalEntry {
    pub id: i64,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: CapitalKind,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
