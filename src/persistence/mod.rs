//! Persistence Layer
//!
//! SQLite storage for accounts, the transaction ledger, the cached stock
//! listing and login sessions, accessed asynchronously through sqlx.
//!
//! # Database Schema
//!
//! ## Accounts Table
//! - id: UUID
//! - email: unique, lower-cased, doubles as the username
//! - first_name, last_name
//! - password_hash: `pbkdf2-sha256$iterations$salt$hash`
//! - balance: decimal stored as TEXT
//! - version: bumped on every balance change
//!
//! ## Transactions Table
//! - id: UUID
//! - account_id: Foreign key to accounts
//! - symbol
//! - quantity: signed (positive = buy, negative = sell)
//! - unit_price, total: decimal stored as TEXT
//! - executed_at: Timestamp
//!
//! ## Stocks Table
//! - symbol: primary key
//! - name, price
//! - top_rank: position in the homepage listing, NULL when not listed
//!
//! ## Sessions Table
//! - id: UUID carried in the session token
//! - account_id, created_at, expires_at, revoked

pub mod models;
pub mod repository;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::errors::TradeError;

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database initialization error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl From<DatabaseError> for TradeError {
    fn from(e: DatabaseError) -> Self {
        TradeError::Storage(e.to_string())
    }
}

/// Initialize the database connection pool and bring the schema up to date
pub async fn init_database(config: &DatabaseConfig) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", config.url);

    if let Some(db_path) = config.url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
                })?;
            }
        }
    }

    let log_level = if config.log_queries {
        tracing::log::LevelFilter::Debug
    } else {
        tracing::log::LevelFilter::Trace
    };

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(log_level);

    // Every connection to `sqlite::memory:` opens its own private database.
    let in_memory = config.is_in_memory();
    let options = if in_memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };
    let max_connections = if in_memory {
        if config.max_connections > 1 {
            warn!("In-memory database limited to a single connection");
        }
        1
    } else {
        config.max_connections
    };

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if in_memory {
        // The database lives only as long as its one connection
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;

    run_migrations(&pool).await?;

    info!("✓ Database initialized successfully");

    Ok(pool)
}

/// Run database migrations
async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    let statements: [(&str, &str); 8] = [
        (
            "accounts table",
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                balance TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        ),
        (
            "transactions table",
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                quantity INTEGER NOT NULL CHECK(quantity != 0),
                unit_price TEXT NOT NULL,
                total TEXT NOT NULL,
                executed_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (account_id) REFERENCES accounts(id)
            )
            "#,
        ),
        (
            "stocks table",
            r#"
            CREATE TABLE IF NOT EXISTS stocks (
                symbol TEXT PRIMARY KEY,
                name TEXT,
                price TEXT NOT NULL,
                top_rank INTEGER,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        ),
        (
            "sessions table",
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                expires_at DATETIME NOT NULL,
                revoked BOOLEAN NOT NULL DEFAULT 0,
                FOREIGN KEY (account_id) REFERENCES accounts(id)
            )
            "#,
        ),
        (
            "transactions index",
            "CREATE INDEX IF NOT EXISTS idx_transactions_account_symbol ON transactions(account_id, symbol)",
        ),
        (
            "transactions time index",
            "CREATE INDEX IF NOT EXISTS idx_transactions_executed_at ON transactions(executed_at)",
        ),
        (
            "stocks rank index",
            "CREATE INDEX IF NOT EXISTS idx_stocks_top_rank ON stocks(top_rank)",
        ),
        (
            "sessions index",
            "CREATE INDEX IF NOT EXISTS idx_sessions_account ON sessions(account_id)",
        ),
    ];

    for (name, sql) in statements {
        sqlx::query(sql).execute(pool).await.map_err(|e| {
            DatabaseError::MigrationError(format!("Failed to create {}: {}", name, e))
        })?;
    }

    info!("✓ Database migrations completed successfully");

    Ok(())
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://data/tradedesk.db")
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Enable query logging
    pub log_queries: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/tradedesk.db".to_string(),
            max_connections: 5,
            log_queries: cfg!(debug_assertions),
        }
    }
}

impl DatabaseConfig {
    /// Load from a key/value source, normally the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let url = lookup("DATABASE_URL").unwrap_or(defaults.url);

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_connections);

        let log_queries = lookup("DATABASE_LOG_QUERIES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.log_queries);

        Self {
            url,
            max_connections,
            log_queries,
        }
    }

    /// In-memory database, used by tests
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            log_queries: false,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}
