//! Portfolio Service
//!
//! The single write path into the two ledgers, and the read path that folds
//! them into holdings and snapshots. Mutations serialize through one lock so
//! validate-then-append is atomic per portfolio; reads fold a point-in-time
//! listing without locking.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::entities::capital::{CapitalEntry, CapitalKind};
use crate::domain::entities::holding::{Holding, PortfolioSnapshot};
use crate::domain::entities::order::{Order, OrderSide};
use crate::domain::entities::quote::{CoinInfo, Quote};
use crate::domain::entities::watchlist::WatchlistItem;
use crate::domain::errors::PortfolioError;
use crate::domain::services::aggregator::{
    self, available_usdt, fold_capital, fold_holdings, held_amount, validate_replay,
};
use crate::domain::services::price_cache::CachedPriceFeed;
use crate::domain::services::valuation::{build_snapshot, value_holding};
use crate::domain::value_objects::amount::Amount;
use crate::persistence::models::{CreateCapital, CreateOrder};
use crate::persistence::repository::{CapitalRepository, OrderRepository, WatchlistRepository};
use crate::persistence::DbPool;

/// Decimal places kept when deriving an asset quantity from a cash total.
const QUANTITY_SCALE: u32 = 8;

/// Input for placing an order. Exactly one of `amount` / `total_usdt` is
/// required; the other side is derived from the resolved price.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub asset: String,
    pub side: OrderSide,
    pub amount: Option<Amount>,
    pub total_usdt: Option<Amount>,
    pub price: Option<Amount>,
    pub is_custom_price: bool,
}

/// One asset's position, valuation, and order history.
#[derive(Debug, Clone, Serialize)]
pub struct AssetDetail {
    #[serde(flatten)]
    pub valuation: crate::domain::entities::holding::HoldingDetail,
    pub change_24h: Decimal,
    pub percent_change_24h: Decimal,
    pub orders: Vec<Order>,
}

pub struct PortfolioService {
    capitals: CapitalRepository,
    orders: OrderRepository,
    watchlist: WatchlistRepository,
    prices: Arc<CachedPriceFeed>,
    // Serializes all ledger mutations so no two writers validate against
    // the same stale fold.
    write_lock: Mutex<()>,
}

impl PortfolioService {
    pub fn new(pool: DbPool, prices: Arc<CachedPriceFeed>) -> Self {
        Self {
            capitals: CapitalRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            watchlist: WatchlistRepository::new(pool),
            prices,
            write_lock: Mutex::new(()),
        }
    }

    // ---- Capital ledger ----

    /// Capital history, newest-first.
    pub async fn list_capitals(&self) -> Result<Vec<CapitalEntry>, PortfolioError> {
        let mut entries = Vec::new();
        for record in self.capitals.list_desc().await? {
            entries.push(record.into_entry()?);
        }
        Ok(entries)
    }

    /// Append a capital entry.
    ///
    /// A withdrawal is checked against `available_usdt` folded from the
    /// ledgers excluding the new entry; an over-draw fails with
    /// `InsufficientFunds` before anything is written.
    pub async fn record_capital(
        &self,
        amount: Amount,
        kind: CapitalKind,
        description: Option<String>,
    ) -> Result<CapitalEntry, PortfolioError> {
        let _guard = self.write_lock.lock().await;

        if kind == CapitalKind::Withdraw {
            let available = self.current_available().await?;
            if amount.value() > available {
                return Err(PortfolioError::InsufficientFunds {
                    required: amount.value(),
                    available,
                });
            }
        }

        let record = self
            .capitals
            .create(CreateCapital {
                amount: amount.value(),
                kind,
                description,
            })
            .await?;
        let entry = record.into_entry()?;
        info!("Recorded {} capital entry {} ({})", kind, entry.id, amount);
        Ok(entry)
    }

    /// Delete a capital entry, reversing its exact effect on the fold.
    ///
    /// Withdrawals and realized losses are protected. A deposit whose cash
    /// has already been spent cannot be deleted either: replaying the
    /// ledgers without it would drive available cash negative.
    pub async fn delete_capital(&self, id: i64) -> Result<(), PortfolioError> {
        let _guard = self.write_lock.lock().await;

        let record = self.capitals.get(id).await?.ok_or(PortfolioError::NotFound)?;
        let entry = record.into_entry()?;
        if entry.kind.is_protected() {
            return Err(PortfolioError::Protected { kind: entry.kind });
        }

        let remaining: Vec<CapitalEntry> = self
            .load_capital_asc()
            .await?
            .into_iter()
            .filter(|e| e.id != id)
            .collect();
        let orders = self.load_orders_asc().await?;
        let available = available_usdt(&fold_capital(&remaining), &orders);
        if available < Decimal::ZERO {
            return Err(PortfolioError::Conflict(format!(
                "Deleting capital entry {} would leave available cash at {}",
                id, available
            )));
        }

        self.capitals.delete(id).await?;
        info!("Deleted capital entry {}", id);
        Ok(())
    }

    // ---- Order ledger ----

    /// Order history, newest-first, optionally for one asset.
    pub async fn list_orders(&self, asset: Option<&str>) -> Result<Vec<Order>, PortfolioError> {
        let records = match asset {
            Some(asset) => self.orders.list_by_asset_desc(asset).await?,
            None => self.orders.list_desc().await?,
        };
        let mut orders = Vec::new();
        for record in records {
            orders.push(record.into_order()?);
        }
        Ok(orders)
    }

    /// Validate and append a trade order.
    ///
    /// A buy must be covered by available cash, a sell by the held amount
    /// folded from prior orders; violations fail with the shortfall and are
    /// never clamped. A non-custom price is resolved from the price feed at
    /// placement time.
    pub async fn place_order(&self, req: PlaceOrder) -> Result<Order, PortfolioError> {
        let asset = req.asset.trim().to_uppercase();
        if asset.is_empty() {
            return Err(PortfolioError::Validation("Asset is required".to_string()));
        }
        if asset == "USDT" {
            return Err(PortfolioError::Validation(
                "USDT is the cash balance, not a tradable asset".to_string(),
            ));
        }

        let price = match (req.is_custom_price, req.price) {
            (true, Some(price)) => price.value(),
            (true, None) => {
                return Err(PortfolioError::Validation(
                    "Custom-price orders must include a price".to_string(),
                ))
            }
            (false, _) => {
                let quote = self
                    .prices
                    .quote(&asset)
                    .await
                    .map_err(|e| PortfolioError::PriceFeedUnavailable(e.to_string()))?;
                quote.price
            }
        };
        if price <= Decimal::ZERO {
            return Err(PortfolioError::Validation(format!(
                "Resolved price for {} must be positive, got {}",
                asset, price
            )));
        }

        let (amount, total_usdt) = match (req.amount, req.total_usdt) {
            (Some(amount), _) => (amount.value(), amount.value() * price),
            (None, Some(total)) => {
                let derived = (total.value() / price).round_dp(QUANTITY_SCALE);
                if derived.is_zero() {
                    return Err(PortfolioError::Validation(format!(
                        "Total {} is too small to buy any {} at {}",
                        total, asset, price
                    )));
                }
                (derived, total.value())
            }
            (None, None) => {
                return Err(PortfolioError::Validation(
                    "Either amount or total_usdt is required".to_string(),
                ))
            }
        };

        let _guard = self.write_lock.lock().await;

        match req.side {
            OrderSide::Buy => {
                let available = self.current_available().await?;
                if total_usdt > available {
                    return Err(PortfolioError::InsufficientFunds {
                        required: total_usdt,
                        available,
                    });
                }
            }
            OrderSide::Sell => {
                let orders = self.load_orders_asc().await?;
                let held = held_amount(&orders, &asset);
                if amount > held {
                    return Err(PortfolioError::InsufficientPosition {
                        asset: asset.clone(),
                        requested: amount,
                        held,
                    });
                }
            }
        }

        let record = self
            .orders
            .create(CreateOrder {
                asset: asset.clone(),
                side: req.side,
                amount,
                price,
                total_usdt,
                is_custom_price: req.is_custom_price,
            })
            .await?;
        let order = record.into_order()?;
        info!(
            "Placed {} order {}: {} {} @ {} ({} USDT)",
            req.side, order.id, amount, asset, price, total_usdt
        );
        Ok(order)
    }

    /// Delete an order if the ledger still replays cleanly without it.
    ///
    /// Removing a buy whose position a later sell already consumed, or a
    /// sell whose proceeds were already spent, is a `Conflict`.
    pub async fn delete_order(&self, id: i64) -> Result<(), PortfolioError> {
        let _guard = self.write_lock.lock().await;

        if self.orders.get(id).await?.is_none() {
            return Err(PortfolioError::NotFound);
        }

        let remaining: Vec<Order> = self
            .load_orders_asc()
            .await?
            .into_iter()
            .filter(|o| o.id != id)
            .collect();

        if let Err(violating_id) = validate_replay(&remaining) {
            return Err(PortfolioError::Conflict(format!(
                "Deleting order {} would leave order {} without sufficient position",
                id, violating_id
            )));
        }

        let capital = fold_capital(&self.load_capital_asc().await?);
        let available = available_usdt(&capital, &remaining);
        if available < Decimal::ZERO {
            return Err(PortfolioError::Conflict(format!(
                "Deleting order {} would leave available cash at {}",
                id, available
            )));
        }

        self.orders.delete(id).await?;
        info!("Deleted order {}", id);
        Ok(())
    }

    // ---- Derived reads ----

    /// Current holdings folded from the order ledger.
    pub async fn holdings(&self) -> Result<Vec<Holding>, PortfolioError> {
        let orders = self.load_orders_asc().await?;
        Ok(fold_holdings(&orders))
    }

    /// Full portfolio snapshot against current market prices.
    ///
    /// A per-asset price failure degrades that asset to a stale or
    /// unavailable marker; it never aborts the snapshot.
    pub async fn snapshot(&self) -> Result<PortfolioSnapshot, PortfolioError> {
        let entries = self.load_capital_asc().await?;
        let orders = self.load_orders_asc().await?;

        let capital = fold_capital(&entries);
        let holdings = fold_holdings(&orders);
        let available = available_usdt(&capital, &orders);

        let symbols: Vec<String> = holdings.iter().map(|h| h.asset.clone()).collect();
        let prices = self.prices.resolve(&symbols).await;

        Ok(build_snapshot(&capital, available, &holdings, &prices))
    }

    /// Position, valuation, and order history for one asset.
    pub async fn asset_detail(&self, symbol: &str) -> Result<AssetDetail, PortfolioError> {
        let symbol = symbol.trim().to_uppercase();
        let orders = self.load_orders_asc().await?;
        let holdings = fold_holdings(&orders);
        let holding = holdings
            .iter()
            .find(|h| h.asset == symbol)
            .ok_or(PortfolioError::NotFound)?;

        let capital = fold_capital(&self.load_capital_asc().await?);
        let prices = self.prices.resolve(std::slice::from_ref(&symbol)).await;
        let valuation = value_holding(holding, &prices, capital.total_capital());

        let (change_24h, percent_change_24h) = prices
            .get(&symbol)
            .map(|r| (r.quote.change_24h, r.quote.percent_change_24h))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        let mut history: Vec<Order> =
            orders.into_iter().filter(|o| o.asset == symbol).collect();
        history.reverse();

        Ok(AssetDetail {
            valuation,
            change_24h,
            percent_change_24h,
            orders: history,
        })
    }

    /// Quotes for an explicit symbol list (live or stale).
    pub async fn quotes_for(&self, symbols: &[String]) -> Vec<Quote> {
        self.prices
            .resolve(symbols)
            .await
            .into_values()
            .map(|r| r.quote)
            .collect()
    }

    /// Single live quote, bubbling feed failure to the caller.
    pub async fn quote(&self, symbol: &str) -> Result<Quote, PortfolioError> {
        let symbol = symbol.trim().to_uppercase();
        self.prices
            .quote(&symbol)
            .await
            .map_err(|e| PortfolioError::PriceFeedUnavailable(e.to_string()))
    }

    /// Market listing from the feed.
    pub async fn top_coins(&self, limit: u32) -> Result<Vec<CoinInfo>, PortfolioError> {
        self.prices
            .top_coins(limit)
            .await
            .map_err(|e| PortfolioError::PriceFeedUnavailable(e.to_string()))
    }

    // ---- Watchlist ----

    pub async fn watchlist(&self) -> Result<Vec<WatchlistItem>, PortfolioError> {
        let records = self.watchlist.list().await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    pub async fn watch(
        &self,
        symbol: &str,
        name: Option<&str>,
    ) -> Result<WatchlistItem, PortfolioError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(PortfolioError::Validation("Symbol is required".to_string()));
        }
        let record = self.watchlist.upsert(&symbol, name).await?;
        Ok(record.into())
    }

    pub async fn unwatch(&self, symbol: &str) -> Result<(), PortfolioError> {
        let symbol = symbol.trim().to_uppercase();
        if !self.watchlist.delete(&symbol).await? {
            return Err(PortfolioError::NotFound);
        }
        Ok(())
    }

    pub async fn watchlist_quotes(&self) -> Result<Vec<Quote>, PortfolioError> {
        let symbols: Vec<String> = self
            .watchlist
            .list()
            .await?
            .into_iter()
            .map(|r| r.symbol)
            .collect();
        Ok(self.quotes_for(&symbols).await)
    }

    // ---- Reset ----

    /// Clear both ledgers and the watchlist. Destructive and irreversible.
    pub async fn reset_all(&self) -> Result<(), PortfolioError> {
        let _guard = self.write_lock.lock().await;
        self.orders.delete_all().await?;
        self.capitals.delete_all().await?;
        self.watchlist.delete_all().await?;
        info!("All ledgers reset");
        Ok(())
    }

    // ---- Internals ----

    async fn load_capital_asc(&self) -> Result<Vec<CapitalEntry>, PortfolioError> {
        let mut entries = Vec::new();
        for record in self.capitals.list_asc().await? {
            entries.push(record.into_entry()?);
        }
        Ok(entries)
    }

    async fn load_orders_asc(&self) -> Result<Vec<Order>, PortfolioError> {
        let mut orders = Vec::new();
        for record in self.orders.list_asc().await? {
            orders.push(record.into_order()?);
        }
        Ok(orders)
    }

    async fn current_available(&self) -> Result<Decimal, PortfolioError> {
        let entries = self.load_capital_asc().await?;
        let orders = self.load_orders_asc().await?;
        Ok(aggregator::available_usdt(&fold_capital(&entries), &orders))
    }
}
