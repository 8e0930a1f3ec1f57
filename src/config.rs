use crate::persistence::DatabaseConfig;
use rust_decimal::Decimal;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

/// Minimum session secret length (256 bits)
pub const MIN_SESSION_SECRET_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("{name} must be at least {min} characters long (found {found})")]
    TooShort {
        name: &'static str,
        min: usize,
        found: usize,
    },
}

/// Market data provider settings
#[derive(Clone)]
pub struct StockApiConfig {
    /// Base URL of an IEX-compatible API, e.g. "https://cloud.iexapis.com/stable"
    pub base_url: String,
    /// API token; without one the service falls back to built-in sample quotes
    pub token: Option<Zeroizing<String>>,
    pub request_timeout: Duration,
}

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database: DatabaseConfig,
    pub stock_api: StockApiConfig,
    pub session_secret: Zeroizing<String>,
    pub session_ttl: chrono::Duration,
    /// PBKDF2 rounds for new password hashes
    pub password_iterations: u32,
    /// Send the session cookie with the `Secure` attribute
    pub secure_cookies: bool,
    /// Cash credited to every new account
    pub starting_balance: Decimal,
    pub market_refresh_interval: Duration,
    /// Number of most-active stocks shown on the homepage
    pub top_list_size: usize,
    pub quote_cache_ttl: Duration,
    pub quote_cache_capacity: usize,
    /// Login/registration attempts allowed per minute, across all clients
    pub auth_rate_limit_per_minute: u32,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database", &self.database)
            .field("stock_api_base_url", &self.stock_api.base_url)
            .field("stock_api_token", &self.stock_api.token.as_ref().map(|_| "<redacted>"))
            .field("session_ttl", &self.session_ttl)
            .field("starting_balance", &self.starting_balance)
            .field("top_list_size", &self.top_list_size)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Defaults for everything except the session secret
    pub fn with_secret(session_secret: &str) -> AppConfig {
        AppConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            database: DatabaseConfig::default(),
            stock_api: StockApiConfig {
                base_url: "https://cloud.iexapis.com/stable".to_string(),
                token: None,
                request_timeout: Duration::from_secs(10),
            },
            session_secret: Zeroizing::new(session_secret.to_string()),
            session_ttl: chrono::Duration::hours(24),
            password_iterations: 100_000,
            secure_cookies: false,
            starting_balance: Decimal::from(100_000),
            market_refresh_interval: Duration::from_secs(300),
            top_list_size: 20,
            quote_cache_ttl: Duration::from_secs(15),
            quote_cache_capacity: 256,
            auth_rate_limit_per_minute: 30,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<AppConfig, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from a key/value source. Invalid optional values
    /// are logged and replaced by their default; a missing or weak
    /// `SESSION_SECRET` is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig, ConfigError> {
        let secret = lookup("SESSION_SECRET")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("SESSION_SECRET"))?;
        if secret.len() < MIN_SESSION_SECRET_LENGTH {
            tracing::error!(
                "SESSION_SECRET is too weak (length: {}, minimum: {})",
                secret.len(),
                MIN_SESSION_SECRET_LENGTH
            );
            return Err(ConfigError::TooShort {
                name: "SESSION_SECRET",
                min: MIN_SESSION_SECRET_LENGTH,
                found: secret.len(),
            });
        }

        let mut config = AppConfig::with_secret(&secret);
        config.database = DatabaseConfig::from_lookup(&lookup);

        config.bind_addr = parse_or(&lookup, "BIND_ADDR", config.bind_addr, |_| true);

        if let Some(url) = lookup("STOCK_API_BASE_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            if url.starts_with("http://") || url.starts_with("https://") {
                config.stock_api.base_url = url;
            } else {
                tracing::warn!(
                    "Invalid STOCK_API_BASE_URL '{}', using default: {}",
                    url,
                    config.stock_api.base_url
                );
            }
        }
        config.stock_api.token = lookup("STOCK_API_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Zeroizing::new);
        let timeout_secs = parse_or(&lookup, "STOCK_API_TIMEOUT_SECS", 10u64, |v| *v > 0);
        config.stock_api.request_timeout = Duration::from_secs(timeout_secs);

        let ttl_hours = parse_or(&lookup, "SESSION_TTL_HOURS", 24i64, |v| (1..=24 * 90).contains(v));
        config.session_ttl = chrono::Duration::hours(ttl_hours);
        config.password_iterations = parse_or(&lookup, "PASSWORD_HASH_ITERATIONS", config.password_iterations, |v| {
            *v >= 1_000
        });
        config.secure_cookies = parse_bool(&lookup, "SECURE_COOKIES", config.secure_cookies);

        config.starting_balance = parse_or(&lookup, "STARTING_BALANCE", config.starting_balance, |v| {
            !v.is_sign_negative()
        });

        let refresh_secs = parse_or(&lookup, "MARKET_REFRESH_SECS", 300u64, |v| *v >= 10);
        config.market_refresh_interval = Duration::from_secs(refresh_secs);
        config.top_list_size = parse_or(&lookup, "TOP_LIST_SIZE", config.top_list_size, |v| {
            (1..=100).contains(v)
        });

        let cache_secs = parse_or(&lookup, "QUOTE_CACHE_TTL_SECS", 15u64, |_| true);
        config.quote_cache_ttl = Duration::from_secs(cache_secs);
        config.quote_cache_capacity = parse_or(&lookup, "QUOTE_CACHE_CAPACITY", config.quote_cache_capacity, |v| {
            *v > 0
        });

        config.auth_rate_limit_per_minute = parse_or(
            &lookup,
            "AUTH_RATE_LIMIT_PER_MINUTE",
            config.auth_rate_limit_per_minute,
            |v| *v > 0,
        );

        Ok(config)
    }
}

/// Parse `name` if set, keeping `default` when the value is unparsable or
/// fails `valid`.
fn parse_or<T, L>(lookup: &L, name: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
    L: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        Ok(value) => {
            tracing::warn!("Invalid {} value: {}, using default: {}", name, value, default);
            default
        }
        Err(e) => {
            tracing::warn!("Failed to parse {} '{}': {}, using default: {}", name, raw, e, default);
            default
        }
    }
}

fn parse_bool<L>(lookup: &L, name: &str, default: bool) -> bool
where
    L: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) => v.eq_ignore_ascii_case("true") || v == "1",
        None => default,
    }
}
