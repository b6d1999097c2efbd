use std::net::{IpAddr, Ipv4Addr};

/// Runtime configuration, loaded from environment variables with sane
/// defaults for local development.
#[derive(Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    /// CoinMarketCap API key. Without one the feed serves deterministic
    /// mock quotes, which is fine for development.
    pub cmc_api_key: Option<String>,
    pub price_request_timeout_seconds: u64,
    pub price_cache_ttl_seconds: u64,
    /// Symbols served by the market ticker endpoint in addition to held
    /// assets.
    pub tracked_symbols: Vec<String>,
}

impl AppConfig {
    pub fn default() -> AppConfig {
        AppConfig {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8080,
            database_url: "sqlite://data/hodlbook.db".to_string(),
            cmc_api_key: None,
            price_request_timeout_seconds: 10,
            price_cache_ttl_seconds: 60,
            tracked_symbols: vec![
                "BTC".to_string(),
                "ETH".to_string(),
                "SOL".to_string(),
                "ONDO".to_string(),
                "LINK".to_string(),
            ],
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable values log a warning and fall back to the default
    /// rather than aborting startup.
    pub fn from_env() -> AppConfig {
        let mut config = AppConfig::default();

        if let Ok(host) = std::env::var("HOST") {
            match host.parse::<IpAddr>() {
                Ok(value) => config.host = value,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse HOST '{}': {}, using default: {}",
                        host,
                        e,
                        config.host
                    );
                }
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(value) if value > 0 => config.port = value,
                _ => {
                    tracing::warn!(
                        "Invalid PORT value '{}', using default: {}",
                        port,
                        config.port
                    );
                }
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                config.database_url = url;
            }
        }

        if let Ok(key) = std::env::var("CMC_API_KEY") {
            if !key.trim().is_empty() {
                config.cmc_api_key = Some(key);
            }
        }

        if let Ok(timeout) = std::env::var("PRICE_REQUEST_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(value) if (1..=60).contains(&value) => {
                    config.price_request_timeout_seconds = value;
                }
                _ => {
                    tracing::warn!(
                        "Invalid PRICE_REQUEST_TIMEOUT_SECONDS '{}' (must be 1-60), using default: {}",
                        timeout,
                        config.price_request_timeout_seconds
                    );
                }
            }
        }

        if let Ok(ttl) = std::env::var("PRICE_CACHE_TTL_SECONDS") {
            match ttl.parse::<u64>() {
                Ok(value) => config.price_cache_ttl_seconds = value,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse PRICE_CACHE_TTL_SECONDS '{}': {}, using default: {}",
                        ttl,
                        e,
                        config.price_cache_ttl_seconds
                    );
                }
            }
        }

        if let Ok(symbols) = std::env::var("TRACKED_SYMBOLS") {
            let parsed: Vec<String> = symbols
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                config.tracked_symbols = parsed;
            }
        }

        config
    }
}
