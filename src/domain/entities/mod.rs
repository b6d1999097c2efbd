pub mod capital;
pub mod holding;
pub mod order;
pub mod quote;
pub mod watchlist;
