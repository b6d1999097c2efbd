use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::entities::capital::CapitalKind;
use crate::persistence::DatabaseError;

/// Errors surfaced by portfolio operations.
///
/// All variants are terminal for the single operation that produced them.
/// Business-rule violations carry the shortfall so the caller can report it;
/// nothing is clamped or replaced with a default value.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Insufficient {asset} position: requested {requested}, held {held}")]
    InsufficientPosition {
        asset: String,
        requested: Decimal,
        held: Decimal,
    },

    #[error("{kind} entries cannot be deleted")]
    Protected { kind: CapitalKind },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found")]
    NotFound,

    #[error("Price feed unavailable: {0}")]
    PriceFeedUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Errors from the external price feed adapter.
#[derive(Debug, Clone, Error)]
pub enum PriceFeedError {
    #[error("No quote available for symbol: {0}")]
    UnknownSymbol(String),

    #[error("Price feed request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse price feed response: {0}")]
    ParseError(String),
}
