use std::sync::Arc;

use crate::application::services::auth_service::AuthService;
use crate::application::services::market_service::MarketService;
use crate::application::services::trade_service::TradeService;
use crate::config::AppConfig;
use crate::infrastructure::stock_api::StockDataProvider;
use crate::persistence::DbPool;
use crate::rate_limit::{create_rate_limiter, GlobalRateLimiter, RateLimiterConfig};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub market: Arc<MarketService>,
    pub trading: Arc<TradeService>,
    /// Throttles login and registration submissions
    pub auth_limiter: GlobalRateLimiter,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(pool: DbPool, provider: Arc<dyn StockDataProvider>, config: &AppConfig) -> Self {
        Self {
            auth: Arc::new(AuthService::new(pool.clone(), config)),
            market: Arc::new(MarketService::new(provider.clone(), pool.clone(), config.top_list_size)),
            trading: Arc::new(TradeService::new(provider, pool)),
            auth_limiter: create_rate_limiter(RateLimiterConfig {
                requests_per_minute: config.auth_rate_limit_per_minute,
            }),
            secure_cookies: config.secure_cookies,
        }
    }
}
