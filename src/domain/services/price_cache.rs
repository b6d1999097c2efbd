//! Cached Price Feed
//!
//! Wraps the external `PriceFeed` with a last-known-quote cache. A fresh
//! cache hit skips the network entirely; a feed failure is retried once and
//! then degrades to the cached quote marked stale. Symbols with no cached
//! quote at all are simply absent from the resolved map — the valuation
//! layer decides how to carry them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::entities::holding::PriceStatus;
use crate::domain::entities::quote::Quote;
use crate::domain::repositories::price_feed::{PriceFeed, PriceFeedResult};
use crate::domain::services::valuation::ResolvedQuote;

#[derive(Clone)]
struct CachedQuote {
    quote: Quote,
    fetched_at: Instant,
}

pub struct CachedPriceFeed {
    feed: Arc<dyn PriceFeed>,
    cache: Mutex<HashMap<String, CachedQuote>>,
    ttl: Duration,
}

impl CachedPriceFeed {
    pub fn new(feed: Arc<dyn PriceFeed>, ttl: Duration) -> Self {
        Self {
            feed,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Fetch one quote, retrying once on failure. The result is cached.
    pub async fn quote(&self, symbol: &str) -> PriceFeedResult<Quote> {
        if let Some(cached) = self.fresh(symbol).await {
            debug!("Returning cached quote for {}", symbol);
            return Ok(cached);
        }

        let quote = match self.feed.quote(symbol).await {
            Ok(q) => q,
            Err(first) => {
                warn!("Quote fetch failed for {} ({}), retrying once", symbol, first);
                self.feed.quote(symbol).await?
            }
        };

        self.store(&quote).await;
        Ok(quote)
    }

    /// Resolve quotes for a set of symbols, degrading per symbol.
    ///
    /// Live quotes come from the feed (one batch call, one retry); on
    /// failure each symbol falls back to its last-known quote marked
    /// `Stale`. Symbols with neither are left out of the map.
    pub async fn resolve(&self, symbols: &[String]) -> HashMap<String, ResolvedQuote> {
        let mut resolved: HashMap<String, ResolvedQuote> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();

        for symbol in symbols {
            match self.fresh(symbol).await {
                Some(quote) => {
                    resolved.insert(
                        symbol.clone(),
                        ResolvedQuote {
                            quote,
                            status: PriceStatus::Live,
                        },
                    );
                }
                None => missing.push(symbol.clone()),
            }
        }

        if !missing.is_empty() {
            match self.fetch_batch(&missing).await {
                Ok(quotes) => {
                    for (symbol, quote) in quotes {
                        self.store(&quote).await;
                        resolved.insert(
                            symbol,
                            ResolvedQuote {
                                quote,
                                status: PriceStatus::Live,
                            },
                        );
                    }
                }
                Err(e) => {
                    warn!("Price feed batch failed ({}), falling back to cache", e);
                }
            }

            // Whatever is still unresolved gets the last-known quote, if any.
            let cache = self.cache.lock().await;
            for symbol in &missing {
                if !resolved.contains_key(symbol) {
                    if let Some(cached) = cache.get(symbol) {
                        resolved.insert(
                            symbol.clone(),
                            ResolvedQuote {
                                quote: cached.quote.clone(),
                                status: PriceStatus::Stale,
                            },
                        );
                    }
                }
            }
        }

        resolved
    }

    async fn fetch_batch(&self, symbols: &[String]) -> PriceFeedResult<HashMap<String, Quote>> {
        match self.feed.quotes(symbols).await {
            Ok(quotes) => Ok(quotes),
            Err(first) => {
                warn!("Quote batch failed ({}), retrying once", first);
                self.feed.quotes(symbols).await
            }
        }
    }

    async fn fresh(&self, symbol: &str) -> Option<Quote> {
        let cache = self.cache.lock().await;
        cache
            .get(symbol)
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| c.quote.clone())
    }

    async fn store(&self, quote: &Quote) {
        let mut cache = self.cache.lock().await;
        cache.insert(
            quote.symbol.clone(),
            CachedQuote {
                quote: quote.clone(),
                fetched_at: Instant::now(),
            },
        );
    }

    /// Pass-through to the feed's market listing.
    pub async fn top_coins(&self, limit: u32) -> PriceFeedResult<Vec<crate::domain::entities::quote::CoinInfo>> {
        self.feed.top_coins(limit).await
    }
}
