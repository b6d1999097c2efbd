use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hodlbook::config::AppConfig;
use hodlbook::domain::entities::capital::CapitalKind;
use hodlbook::domain::entities::order::OrderSide;
use hodlbook::domain::errors::PortfolioError;
use hodlbook::domain::services::portfolio::{PlaceOrder, PortfolioService};
use hodlbook::domain::services::price_cache::CachedPriceFeed;
use hodlbook::domain::value_objects::amount::Amount;
use hodlbook::infrastructure::cmc_client::CmcClient;
use hodlbook::persistence::init_database;

#[derive(Clone)]
struct AppState {
    service: Arc<PortfolioService>,
    tracked_symbols: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hodlbook=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    info!("Starting hodlbook server");
    if config.cmc_api_key.is_none() {
        info!("No CMC_API_KEY set, price feed runs in mock mode");
    }

    let pool = init_database(&config.database_url).await?;

    let feed = CmcClient::new(
        config.cmc_api_key.clone(),
        Duration::from_secs(config.price_request_timeout_seconds),
    )?;
    let prices = Arc::new(CachedPriceFeed::new(
        Arc::new(feed),
        Duration::from_secs(config.price_cache_ttl_seconds),
    ));
    let service = Arc::new(PortfolioService::new(pool, prices));

    let state = AppState {
        service,
        tracked_symbols: config.tracked_symbols.clone(),
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/capitals", get(list_capitals).post(create_capital))
        .route("/api/capitals/:id", delete(delete_capital))
        .route("/api/withdraw", post(create_withdrawal))
        .route("/api/realized-loss", post(create_realized_loss))
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/:id", delete(delete_order))
        .route("/api/holdings", get(get_holdings))
        .route("/api/portfolio", get(get_portfolio))
        .route("/api/prices", get(get_prices))
        .route("/api/prices/:symbol", get(get_price))
        .route("/api/assets/:symbol", get(get_asset_detail))
        .route("/api/coins/top", get(get_top_coins))
        .route(
            "/api/watchlist",
            get(get_watchlist).post(add_to_watchlist),
        )
        .route("/api/watchlist/:symbol", delete(remove_from_watchlist))
        .route("/api/watchlist/prices", get(get_watchlist_prices))
        .route("/api/reset", post(reset))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::new(config.host, config.port);
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// ---- Error mapping ----

struct ApiError(PortfolioError);

impl From<PortfolioError> for ApiError {
    fn from(err: PortfolioError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PortfolioError::Validation(_)
            | PortfolioError::InsufficientFunds { .. }
            | PortfolioError::InsufficientPosition { .. } => StatusCode::BAD_REQUEST,
            PortfolioError::NotFound => StatusCode::NOT_FOUND,
            PortfolioError::Protected { .. } | PortfolioError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            PortfolioError::PriceFeedUnavailable(_) => StatusCode::BAD_GATEWAY,
            PortfolioError::Database(e) => {
                error!("Database error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn parse_amount(value: Decimal, field: &str) -> Result<Amount, ApiError> {
    Amount::new(value)
        .map_err(|e| ApiError(PortfolioError::Validation(format!("{}: {}", field, e))))
}

// ---- Handlers ----

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_capitals(State(state): State<AppState>) -> Result<Response, ApiError> {
    let entries = state.service.list_capitals().await?;
    Ok(Json(entries).into_response())
}

#[derive(Debug, Deserialize)]
struct CreateCapitalRequest {
    amount: Decimal,
    #[serde(rename = "type")]
    kind: CapitalKind,
    description: Option<String>,
}

async fn create_capital(
    State(state): State<AppState>,
    Json(req): Json<CreateCapitalRequest>,
) -> Result<Response, ApiError> {
    let amount = parse_amount(req.amount, "amount")?;
    let entry = state
        .service
        .record_capital(amount, req.kind, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

#[derive(Debug, Deserialize)]
struct CapitalAdjustmentRequest {
    amount: Decimal,
    description: Option<String>,
}

async fn create_withdrawal(
    State(state): State<AppState>,
    Json(req): Json<CapitalAdjustmentRequest>,
) -> Result<Response, ApiError> {
    let amount = parse_amount(req.amount, "amount")?;
    let entry = state
        .service
        .record_capital(amount, CapitalKind::Withdraw, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

async fn create_realized_loss(
    State(state): State<AppState>,
    Json(req): Json<CapitalAdjustmentRequest>,
) -> Result<Response, ApiError> {
    let amount = parse_amount(req.amount, "amount")?;
    let entry = state
        .service
        .record_capital(amount, CapitalKind::RealizedLoss, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

async fn delete_capital(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.service.delete_capital(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
struct ListOrdersQuery {
    asset: Option<String>,
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Response, ApiError> {
    let orders = state.service.list_orders(query.asset.as_deref()).await?;
    Ok(Json(orders).into_response())
}

#[derive(Debug, Deserialize)]
struct CreateOrderRequest {
    asset: String,
    #[serde(rename = "type")]
    side: OrderSide,
    amount: Option<Decimal>,
    total_usdt: Option<Decimal>,
    price: Option<Decimal>,
    #[serde(default)]
    is_custom_price: bool,
}

async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Response, ApiError> {
    let amount = req
        .amount
        .map(|v| parse_amount(v, "amount"))
        .transpose()?;
    let total_usdt = req
        .total_usdt
        .map(|v| parse_amount(v, "total_usdt"))
        .transpose()?;
    let price = req.price.map(|v| parse_amount(v, "price")).transpose()?;

    let order = state
        .service
        .place_order(PlaceOrder {
            asset: req.asset,
            side: req.side,
            amount,
            total_usdt,
            price,
            is_custom_price: req.is_custom_price,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.service.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn get_holdings(State(state): State<AppState>) -> Result<Response, ApiError> {
    let holdings = state.service.holdings().await?;
    Ok(Json(holdings).into_response())
}

async fn get_portfolio(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.service.snapshot().await?;
    Ok(Json(snapshot).into_response())
}

/// Ticker quotes: the configured symbols plus anything currently held.
async fn get_prices(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut symbols: BTreeSet<String> = state.tracked_symbols.iter().cloned().collect();
    for holding in state.service.holdings().await? {
        symbols.insert(holding.asset);
    }
    let symbols: Vec<String> = symbols.into_iter().collect();
    let quotes = state.service.quotes_for(&symbols).await;
    Ok(Json(quotes).into_response())
}

async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Response, ApiError> {
    let quote = state.service.quote(&symbol).await?;
    Ok(Json(quote).into_response())
}

async fn get_asset_detail(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Response, ApiError> {
    let detail = state.service.asset_detail(&symbol).await?;
    Ok(Json(detail).into_response())
}

#[derive(Debug, Deserialize)]
struct TopCoinsQuery {
    limit: Option<u32>,
}

async fn get_top_coins(
    State(state): State<AppState>,
    Query(query): Query<TopCoinsQuery>,
) -> Result<Response, ApiError> {
    let limit = query.limit.unwrap_or(100).min(500);
    let coins = state.service.top_coins(limit).await?;
    Ok(Json(coins).into_response())
}

async fn get_watchlist(State(state): State<AppState>) -> Result<Response, ApiError> {
    let items = state.service.watchlist().await?;
    Ok(Json(items).into_response())
}

#[derive(Debug, Deserialize)]
struct WatchRequest {
    symbol: String,
    name: Option<String>,
}

async fn add_to_watchlist(
    State(state): State<AppState>,
    Json(req): Json<WatchRequest>,
) -> Result<Response, ApiError> {
    let item = state.service.watch(&req.symbol, req.name.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

async fn remove_from_watchlist(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Response, ApiError> {
    state.service.unwatch(&symbol).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn get_watchlist_prices(State(state): State<AppState>) -> Result<Response, ApiError> {
    let quotes = state.service.watchlist_quotes().await?;
    Ok(Json(quotes).into_response())
}

async fn reset(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.service.reset_all().await?;
    Ok(Json(json!({ "status": "reset" })).into_response())
}
