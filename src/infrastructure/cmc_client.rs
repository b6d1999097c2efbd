//! CoinMarketCap price feed adapter.
//!
//! Implements `PriceFeed` against the CMC Pro API. Without an API key the
//! client serves a small table of deterministic mock quotes so the rest of
//! the system works offline; symbols outside the table are reported as
//! unknown rather than priced at a fake value.

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::domain::entities::quote::{CoinInfo, Quote};
use crate::domain::errors::PriceFeedError;
use crate::domain::repositories::price_feed::{PriceFeed, PriceFeedResult};

const BASE_URL: &str = "https://pro-api.coinmarketcap.com/v1";

#[derive(Debug, Deserialize)]
struct CmcQuoteResponse {
    data: HashMap<String, CmcAsset>,
}

#[derive(Debug, Deserialize)]
struct CmcAsset {
    symbol: String,
    quote: CmcQuote,
}

#[derive(Debug, Deserialize)]
struct CmcQuote {
    #[serde(rename = "USD")]
    usd: CmcPrice,
}

#[derive(Debug, Deserialize)]
struct CmcPrice {
    price: f64,
    #[serde(default)]
    percent_change_1h: f64,
    #[serde(default)]
    percent_change_24h: f64,
    #[serde(default)]
    percent_change_7d: f64,
    #[serde(default)]
    percent_change_30d: f64,
}

#[derive(Debug, Deserialize)]
struct CmcListingsResponse {
    data: Vec<CmcCoinData>,
}

#[derive(Debug, Deserialize)]
struct CmcCoinData {
    symbol: String,
    name: String,
    quote: CmcQuote,
}

pub struct CmcClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl CmcClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, PriceFeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceFeedError::RequestFailed(e.to_string()))?;
        Ok(Self { client, api_key })
    }

    async fn fetch_quotes(
        &self,
        api_key: &str,
        symbols: &str,
    ) -> PriceFeedResult<HashMap<String, Quote>> {
        let url = format!("{}/cryptocurrency/quotes/latest?symbol={}", BASE_URL, symbols);
        debug!("Fetching quotes for {}", symbols);

        let response = self
            .client
            .get(&url)
            .header("X-CMC_PRO_API_KEY", api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PriceFeedError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PriceFeedError::RequestFailed(format!(
                "HTTP {} from quotes endpoint",
                response.status()
            )));
        }

        let body: CmcQuoteResponse = response
            .json()
            .await
            .map_err(|e| PriceFeedError::ParseError(e.to_string()))?;

        let mut quotes = HashMap::new();
        for asset in body.data.into_values() {
            let quote = quote_from_cmc(&asset.symbol, &asset.quote.usd)?;
            quotes.insert(asset.symbol, quote);
        }
        Ok(quotes)
    }
}

#[async_trait]
impl PriceFeed for CmcClient {
    async fn quote(&self, symbol: &str) -> PriceFeedResult<Quote> {
        let Some(api_key) = &self.api_key else {
            return mock_quote(symbol);
        };
        let quotes = self.fetch_quotes(api_key, symbol).await?;
        quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| PriceFeedError::UnknownSymbol(symbol.to_string()))
    }

    async fn quotes(&self, symbols: &[String]) -> PriceFeedResult<HashMap<String, Quote>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let Some(api_key) = &self.api_key else {
            // Unknown symbols are simply omitted from a batch.
            return Ok(symbols
                .iter()
                .filter_map(|s| mock_quote(s).ok().map(|q| (s.clone(), q)))
                .collect());
        };
        self.fetch_quotes(api_key, &symbols.join(",")).await
    }

    async fn top_coins(&self, limit: u32) -> PriceFeedResult<Vec<CoinInfo>> {
        let Some(api_key) = &self.api_key else {
            let mut coins = default_coins();
            coins.truncate(limit as usize);
            return Ok(coins);
        };

        let url = format!(
            "{}/cryptocurrency/listings/latest?limit={}&convert=USD",
            BASE_URL, limit
        );
        let response = self
            .client
            .get(&url)
            .header("X-CMC_PRO_API_KEY", api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| PriceFeedError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PriceFeedError::RequestFailed(format!(
                "HTTP {} from listings endpoint",
                response.status()
            )));
        }

        let body: CmcListingsResponse = response
            .json()
            .await
            .map_err(|e| PriceFeedError::ParseError(e.to_string()))?;

        body.data
            .into_iter()
            .enumerate()
            .map(|(i, coin)| {
                Ok(CoinInfo {
                    symbol: coin.symbol,
                    name: coin.name,
                    price: decimal_from_f64(coin.quote.usd.price)?,
                    rank: i as u32 + 1,
                })
            })
            .collect()
    }
}

fn decimal_from_f64(value: f64) -> PriceFeedResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| PriceFeedError::ParseError(format!("Non-finite price value: {}", value)))
}

fn quote_from_cmc(symbol: &str, price: &CmcPrice) -> PriceFeedResult<Quote> {
    Ok(Quote::from_changes(
        symbol,
        decimal_from_f64(price.price)?,
        decimal_from_f64(price.percent_change_1h)?,
        decimal_from_f64(price.percent_change_24h)?,
        decimal_from_f64(price.percent_change_7d)?,
        decimal_from_f64(price.percent_change_30d)?,
    ))
}

/// Deterministic quotes for keyless development mode.
fn mock_quote(symbol: &str) -> PriceFeedResult<Quote> {
    // (price, pct 1h/24h/7d/30d), Decimal::new(mantissa, scale)
    let (price, p1h, p24h, p7d, p30d) = match symbol {
        "BTC" => (
            Decimal::new(97000, 0),
            Decimal::new(3, 1),
            Decimal::new(21, 1),
            Decimal::new(52, 1),
            Decimal::new(125, 1),
        ),
        "ETH" => (
            Decimal::new(3400, 0),
            Decimal::new(5, 1),
            Decimal::new(32, 1),
            Decimal::new(81, 1),
            Decimal::new(183, 1),
        ),
        "SOL" => (
            Decimal::new(190, 0),
            Decimal::new(12, 1),
            Decimal::new(55, 1),
            Decimal::new(153, 1),
            Decimal::new(352, 1),
        ),
        "ONDO" => (
            Decimal::new(135, 2),
            Decimal::new(8, 1),
            Decimal::new(42, 1),
            Decimal::new(121, 1),
            Decimal::new(285, 1),
        ),
        "LINK" => (
            Decimal::new(23, 0),
            Decimal::new(6, 1),
            Decimal::new(38, 1),
            Decimal::new(95, 1),
            Decimal::new(221, 1),
        ),
        _ => return Err(PriceFeedError::UnknownSymbol(symbol.to_string())),
    };
    Ok(Quote::from_changes(symbol, price, p1h, p24h, p7d, p30d))
}

/// Static market listing for keyless development mode.
fn default_coins() -> Vec<CoinInfo> {
    let coin = |symbol: &str, name: &str, price: Decimal, rank: u32| CoinInfo {
        symbol: symbol.to_string(),
        name: name.to_string(),
        price,
        rank,
    };
    vec![
        coin("BTC", "Bitcoin", Decimal::new(89000, 0), 1),
        coin("ETH", "Ethereum", Decimal::new(3100, 0), 2),
        coin("USDT", "Tether", Decimal::ONE, 3),
        coin("BNB", "BNB", Decimal::new(600, 0), 4),
        coin("SOL", "Solana", Decimal::new(130, 0), 5),
        coin("XRP", "XRP", Decimal::new(22, 1), 6),
        coin("USDC", "USD Coin", Decimal::ONE, 7),
        coin("ADA", "Cardano", Decimal::new(9, 1), 8),
        coin("AVAX", "Avalanche", Decimal::new(35, 0), 9),
        coin("DOGE", "Dogecoin", Decimal::new(32, 2), 10),
        coin("DOT", "Polkadot", Decimal::new(7, 0), 11),
        coin("TRX", "TRON", Decimal::new(25, 2), 12),
        coin("LINK", "Chainlink", Decimal::new(13, 0), 13),
        coin("MATIC", "Polygon", Decimal::new(5, 1), 14),
        coin("SHIB", "Shiba Inu", Decimal::new(22, 6), 15),
        coin("LTC", "Litecoin", Decimal::new(100, 0), 16),
        coin("BCH", "Bitcoin Cash", Decimal::new(450, 0), 17),
        coin("ATOM", "Cosmos", Decimal::new(9, 0), 18),
        coin("UNI", "Uniswap", Decimal::new(12, 0), 19),
        coin("XLM", "Stellar", Decimal::new(4, 1), 20),
        coin("ONDO", "Ondo", Decimal::new(135, 2), 50),
    ]
}
