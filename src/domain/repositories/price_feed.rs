//! Price Feed Trait
//!
//! Boundary to the external market-data service. The accounting core treats
//! the feed as untrusted: it may be slow, stale, or down, and a failed quote
//! must degrade a snapshot per asset instead of failing the whole read.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::entities::quote::{CoinInfo, Quote};
use crate::domain::errors::PriceFeedError;

pub type PriceFeedResult<T> = Result<T, PriceFeedError>;

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetch the current quote for a single symbol.
    async fn quote(&self, symbol: &str) -> PriceFeedResult<Quote>;

    /// Fetch quotes for several symbols in one call.
    ///
    /// Symbols the feed does not know are simply absent from the map; that
    /// is not an error for the batch.
    async fn quotes(&self, symbols: &[String]) -> PriceFeedResult<HashMap<String, Quote>>;

    /// Top coins by market cap, for the trade picker.
    async fn top_coins(&self, limit: u32) -> PriceFeedResult<Vec<CoinInfo>>;
}
