//! hodlbook — single-user crypto portfolio accounting service
//!
//! Holdings and portfolio snapshots are never stored: every read is a fold
//! over the capital and order ledgers, valued against live market prices.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
