pub mod aggregator;
pub mod portfolio;
pub mod price_cache;
pub mod valuation;
