//! End-to-end portfolio lifecycle tests against an in-memory database and
//! the keyless (mock-mode) price feed.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use hodlbook::domain::entities::capital::CapitalKind;
use hodlbook::domain::entities::holding::PriceStatus;
use hodlbook::domain::entities::order::OrderSide;
use hodlbook::domain::errors::PortfolioError;
use hodlbook::domain::services::portfolio::{PlaceOrder, PortfolioService};
use hodlbook::domain::services::price_cache::CachedPriceFeed;
use hodlbook::domain::value_objects::amount::Amount;
use hodlbook::infrastructure::cmc_client::CmcClient;
use hodlbook::persistence::init_database;

async fn test_service() -> PortfolioService {
    let pool = init_database("sqlite::memory:").await.unwrap();
    // No API key: the feed serves deterministic mock quotes (BTC at 97000).
    let feed = CmcClient::new(None, Duration::from_secs(5)).unwrap();
    let prices = Arc::new(CachedPriceFeed::new(
        Arc::new(feed),
        Duration::from_secs(60),
    ));
    PortfolioService::new(pool, prices)
}

fn amount(v: rust_decimal::Decimal) -> Amount {
    Amount::new(v).unwrap()
}

#[tokio::test]
async fn test_full_portfolio_lifecycle() {
    let svc = test_service().await;

    // Fund the book.
    svc.record_capital(amount(dec!(10000)), CapitalKind::Initial, None)
        .await
        .unwrap();
    svc.record_capital(amount(dec!(2000)), CapitalKind::Dca, Some("weekly".into()))
        .await
        .unwrap();

    // Buy BTC twice at different custom prices, then sell half the position.
    svc.place_order(PlaceOrder {
        asset: "BTC".into(),
        side: OrderSide::Buy,
        amount: Some(amount(dec!(0.05))),
        total_usdt: None,
        price: Some(amount(dec!(90000))),
        is_custom_price: true,
    })
    .await
    .unwrap();
    svc.place_order(PlaceOrder {
        asset: "BTC".into(),
        side: OrderSide::Buy,
        amount: Some(amount(dec!(0.05))),
        total_usdt: None,
        price: Some(amount(dec!(100000))),
        is_custom_price: true,
    })
    .await
    .unwrap();
    svc.place_order(PlaceOrder {
        asset: "BTC".into(),
        side: OrderSide::Sell,
        amount: Some(amount(dec!(0.05))),
        total_usdt: None,
        price: Some(amount(dec!(110000))),
        is_custom_price: true,
    })
    .await
    .unwrap();

    let holdings = svc.holdings().await.unwrap();
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].amount, dec!(0.05));
    // Average of the two buys (95000) survives the sell.
    assert_eq!(holdings[0].average_price, dec!(95000));
    assert_eq!(holdings[0].total_cost, dec!(4750));

    let snap = svc.snapshot().await.unwrap();
    assert_eq!(snap.total_capital, dec!(12000));
    // 12000 - 4500 - 5000 + 5500
    assert_eq!(snap.available_usdt, dec!(8000));
    assert_eq!(snap.total_invested, dec!(4750));
    // Mock feed prices BTC at 97000.
    assert_eq!(snap.current_value, dec!(4850.00));
    assert_eq!(snap.unrealized_pnl, dec!(100.00));
    assert_eq!(snap.holdings[0].price_status, PriceStatus::Live);
}

#[tokio::test]
async fn test_unknown_asset_is_carried_at_cost() {
    let svc = test_service().await;
    svc.record_capital(amount(dec!(1000)), CapitalKind::Initial, None)
        .await
        .unwrap();
    // OBSCURE is not in the mock feed's table.
    svc.place_order(PlaceOrder {
        asset: "OBSCURE".into(),
        side: OrderSide::Buy,
        amount: Some(amount(dec!(100))),
        total_usdt: None,
        price: Some(amount(dec!(2))),
        is_custom_price: true,
    })
    .await
    .unwrap();

    let snap = svc.snapshot().await.unwrap();
    let h = &snap.holdings[0];
    assert_eq!(h.price_status, PriceStatus::Unavailable);
    assert_eq!(h.current_price, dec!(2));
    assert_eq!(h.current_value, dec!(200));
    assert_eq!(snap.unrealized_pnl, dec!(0));
}

#[tokio::test]
async fn test_order_placed_with_feed_price() {
    let svc = test_service().await;
    svc.record_capital(amount(dec!(100000)), CapitalKind::Initial, None)
        .await
        .unwrap();

    let order = svc
        .place_order(PlaceOrder {
            asset: "BTC".into(),
            side: OrderSide::Buy,
            amount: None,
            total_usdt: Some(amount(dec!(9700))),
            price: None,
            is_custom_price: false,
        })
        .await
        .unwrap();
    assert_eq!(order.price, dec!(97000));
    assert_eq!(order.amount, dec!(0.1));
}

#[tokio::test]
async fn test_rejections_leave_ledgers_untouched() {
    let svc = test_service().await;
    svc.record_capital(amount(dec!(100)), CapitalKind::Initial, None)
        .await
        .unwrap();

    let buy = svc
        .place_order(PlaceOrder {
            asset: "ETH".into(),
            side: OrderSide::Buy,
            amount: Some(amount(dec!(1))),
            total_usdt: None,
            price: Some(amount(dec!(3400))),
            is_custom_price: true,
        })
        .await;
    assert!(matches!(
        buy.unwrap_err(),
        PortfolioError::InsufficientFunds { .. }
    ));

    let withdraw = svc
        .record_capital(amount(dec!(500)), CapitalKind::Withdraw, None)
        .await;
    assert!(matches!(
        withdraw.unwrap_err(),
        PortfolioError::InsufficientFunds { .. }
    ));

    assert!(svc.list_orders(None).await.unwrap().is_empty());
    assert_eq!(svc.list_capitals().await.unwrap().len(), 1);
    let snap = svc.snapshot().await.unwrap();
    assert_eq!(snap.available_usdt, dec!(100));
}

#[tokio::test]
async fn test_watchlist_and_top_coins() {
    let svc = test_service().await;

    svc.watch("sol", Some("Solana")).await.unwrap();
    svc.watch("btc", None).await.unwrap();

    let quotes = svc.watchlist_quotes().await.unwrap();
    assert_eq!(quotes.len(), 2);

    let coins = svc.top_coins(10).await.unwrap();
    assert_eq!(coins.len(), 10);
    assert_eq!(coins[0].symbol, "BTC");
}
