use std::num::NonZeroUsize;
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradedesk::application::handlers::build_router;
use tradedesk::application::services::market_service::MarketService;
use tradedesk::application::state::AppState;
use tradedesk::config::AppConfig;
use tradedesk::infrastructure::quote_cache::CachedProvider;
use tradedesk::infrastructure::sample_provider::SampleStockProvider;
use tradedesk::infrastructure::stock_api::{HttpStockProvider, StockDataProvider};
use tradedesk::persistence::init_database;
use tradedesk::task_runner::{run_periodically, CircuitBreakerConfig};

/// Form posts are tiny; anything larger is refused before parsing
const MAX_BODY_BYTES: usize = 16 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradedesk=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting tradedesk with {:?}", config);

    let pool = init_database(&config.database).await?;

    let provider = market_data_provider(&config)?;
    let state = AppState::new(pool, provider, &config);

    if let Err(e) = state.auth.purge_sessions().await {
        warn!("Could not purge stale sessions: {}", e);
    }

    spawn_market_refresh(state.market.clone(), config.market_refresh_interval);

    let app = build_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let server = axum::serve(listener, app);

    // Set up graceful shutdown
    let shutdown_signal = async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => error!("Failed to install SIGTERM handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    info!("Server started successfully. Press Ctrl+C to stop.");
    server.with_graceful_shutdown(shutdown_signal).await?;

    info!("Shutdown complete");
    Ok(())
}

/// HTTP provider when a token is configured, built-in sample quotes
/// otherwise; either way behind the quote cache.
fn market_data_provider(config: &AppConfig) -> Result<Arc<dyn StockDataProvider>, Box<dyn std::error::Error>> {
    let inner: Arc<dyn StockDataProvider> = match &config.stock_api.token {
        Some(token) => {
            info!("Using market data from {}", config.stock_api.base_url);
            Arc::new(HttpStockProvider::new(
                &config.stock_api.base_url,
                token.clone(),
                config.stock_api.request_timeout,
            )?)
        }
        None => {
            warn!("STOCK_API_TOKEN is not set, serving built-in sample quotes");
            Arc::new(SampleStockProvider::demo())
        }
    };

    let capacity = NonZeroUsize::new(config.quote_cache_capacity).unwrap_or(NonZeroUsize::MIN);
    Ok(Arc::new(CachedProvider::new(inner, config.quote_cache_ttl, capacity)))
}

/// Background refresh of the homepage ranking
fn spawn_market_refresh(market: Arc<MarketService>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let result = run_periodically("market_refresh", interval, CircuitBreakerConfig::default(), || {
            let market = market.clone();
            async move {
                market
                    .refresh_top_ranks()
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
        })
        .await;

        if let Err(e) = result {
            error!("{}. Homepage ranking will no longer refresh.", e);
        }
    });
}
