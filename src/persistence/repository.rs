//! Database Repository
//!
//! Data access layer for accounts, the trade ledger, the stock listing and
//! sessions.

use super::models::*;
use super::{DatabaseError, DbPool};
use crate::domain::entities::account::UserAccount;
use crate::domain::entities::stock::ListedStock;
use crate::domain::entities::transaction::{Holding, TradeSide, Transaction};
use crate::domain::errors::TradeError;
use crate::domain::services::trade_settlement::{check_trade, SettlementOutcome, TradeIntent};
use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Settlement attempts before giving up with `TradeError::Conflict`
pub const MAX_SETTLEMENT_ATTEMPTS: u32 = 3;

fn query_error(context: &str, e: sqlx::Error) -> DatabaseError {
    error!("{}: {}", context, e);
    DatabaseError::QueryError(format!("{}: {}", context, e))
}

fn storage_error(context: &str, e: impl std::fmt::Display) -> TradeError {
    error!("{}: {}", context, e);
    TradeError::Storage(format!("{}: {}", context, e))
}

/// SQLITE_BUSY or SQLITE_LOCKED, including extended codes such as
/// SQLITE_BUSY_SNAPSHOT (517)
fn is_lock_contention(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false),
        _ => false,
    }
}

fn settlement_error(context: &str, account_id: &str, e: sqlx::Error) -> TradeError {
    if is_lock_contention(&e) {
        debug!("{} for account {}: {}", context, account_id, e);
        TradeError::Conflict {
            account_id: account_id.to_string(),
        }
    } else {
        storage_error(context, e)
    }
}

/// Account repository
#[derive(Clone)]
pub struct AccountRepository {
    pool: DbPool,
}

impl AccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new account. A second account with the same email is
    /// refused with `DatabaseError::UniqueViolation`.
    pub async fn create(&self, account: CreateAccount) -> Result<UserAccount, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, AccountRecord>(
            r#"
            INSERT INTO accounts (
                id, email, first_name, last_name, password_hash,
                balance, version, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
            RETURNING id, email, first_name, last_name, password_hash, balance, version, created_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&account.email)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.password_hash)
        .bind(account.balance.to_string())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
            if duplicate {
                warn!("Registration refused, email already taken: {}", account.email);
                DatabaseError::UniqueViolation(account.email.clone())
            } else {
                query_error("Failed to create account", e)
            }
        })?;

        debug!("Created account: {} for {}", record.id, record.email);
        UserAccount::try_from(record)
    }

    /// Look up an account by email, including its password hash
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DatabaseError> {
        sqlx::query_as::<_, AccountRecord>(
            r#"
            SELECT id, email, first_name, last_name, password_hash, balance, version, created_at
            FROM accounts WHERE email = ?1
            "#,
        )
        .bind(email.to_ascii_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("Failed to look up account by email", e))
    }

    /// Get account by ID
    pub async fn get(&self, id: &str) -> Result<Option<UserAccount>, DatabaseError> {
        let record = sqlx::query_as::<_, AccountRecord>(
            r#"
            SELECT id, email, first_name, last_name, password_hash, balance, version, created_at
            FROM accounts WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("Failed to get account", e))?;

        record.map(UserAccount::try_from).transpose()
    }
}

/// Trade ledger repository
#[derive(Clone)]
pub struct LedgerRepository {
    pool: DbPool,
}

impl LedgerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Settle a priced order against an account.
    ///
    /// Balance, holdings, the balance update and the new ledger row are all
    /// read and written in one transaction. The update only applies if the
    /// account `version` still matches what was read; otherwise the attempt
    /// is rolled back and retried, up to [`MAX_SETTLEMENT_ATTEMPTS`] times.
    /// A database still locked by another writer after the busy timeout
    /// counts as a lost race too.
    pub async fn settle(
        &self,
        account_id: &str,
        side: TradeSide,
        intent: &TradeIntent,
    ) -> Result<SettlementOutcome, TradeError> {
        for attempt in 1..=MAX_SETTLEMENT_ATTEMPTS {
            match self.try_settle(account_id, side, intent).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) | Err(TradeError::Conflict { .. }) => {
                    warn!(
                        "Account {} changed during settlement (attempt {}/{})",
                        account_id, attempt, MAX_SETTLEMENT_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(TradeError::Conflict {
            account_id: account_id.to_string(),
        })
    }

    /// One settlement attempt. `Ok(None)` means the account version moved.
    async fn try_settle(
        &self,
        account_id: &str,
        side: TradeSide,
        intent: &TradeIntent,
    ) -> Result<Option<SettlementOutcome>, TradeError> {
        let settle_error = |context: &str, e: sqlx::Error| settlement_error(context, account_id, e);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| settle_error("Failed to begin settlement", e))?;

        // Writing first takes the write lock under the busy timeout, before
        // any read snapshot exists that another writer could invalidate.
        let locked = sqlx::query("UPDATE accounts SET version = version WHERE id = ?1")
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| settle_error("Failed to lock account", e))?
            .rows_affected();
        if locked == 0 {
            return Err(TradeError::AccountNotFound(account_id.to_string()));
        }

        let (raw_balance, version): (String, i64) =
            sqlx::query_as("SELECT balance, version FROM accounts WHERE id = ?1")
                .bind(account_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| settle_error("Failed to read balance", e))?;
        let balance = parse_decimal("accounts.balance", &raw_balance)
            .map_err(|e| storage_error("Failed to read balance", e))?;

        let owned = match side {
            TradeSide::Buy => 0,
            TradeSide::Sell => {
                let (owned,): (i64,) = sqlx::query_as(
                    "SELECT COALESCE(SUM(quantity), 0) FROM transactions WHERE account_id = ?1 AND symbol = ?2",
                )
                .bind(account_id)
                .bind(intent.symbol.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| settle_error("Failed to read holdings", e))?;
                owned
            }
        };

        // Rejections drop `tx`, which rolls it back.
        let new_balance = check_trade(side, balance, owned, intent)?;

        let now = Utc::now();
        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = ?1, version = version + 1, updated_at = ?2
            WHERE id = ?3 AND version = ?4
            "#,
        )
        .bind(new_balance.to_string())
        .bind(now)
        .bind(account_id)
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(|e| settle_error("Failed to update balance", e))?
        .rows_affected();

        if updated == 0 {
            tx.rollback()
                .await
                .map_err(|e| settle_error("Failed to roll back settlement", e))?;
            return Ok(None);
        }

        let transaction_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO transactions (id, account_id, symbol, quantity, unit_price, total, executed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&transaction_id)
        .bind(account_id)
        .bind(intent.symbol.as_str())
        .bind(side.signed(intent.quantity))
        .bind(intent.unit_price.value().to_string())
        .bind(intent.total_price.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| settle_error("Failed to record transaction", e))?;

        tx.commit()
            .await
            .map_err(|e| settle_error("Failed to commit settlement", e))?;

        debug!(
            "Settled {:?} {} {} for account {} (txn {})",
            side, intent.quantity, intent.symbol, account_id, transaction_id
        );

        Ok(Some(SettlementOutcome {
            side,
            transaction_id,
            symbol: intent.symbol.clone(),
            quantity: intent.quantity,
            unit_price: intent.unit_price,
            total_price: intent.total_price,
            new_balance,
        }))
    }

    /// Every symbol with a non-zero net position
    pub async fn holdings(&self, account_id: &str) -> Result<Vec<Holding>, DatabaseError> {
        let records = sqlx::query_as::<_, HoldingRecord>(
            r#"
            SELECT symbol, SUM(quantity) AS quantity
            FROM transactions
            WHERE account_id = ?1
            GROUP BY symbol
            HAVING SUM(quantity) != 0
            ORDER BY symbol
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("Failed to get holdings", e))?;

        Ok(records.into_iter().map(Holding::from).collect())
    }

    /// Most recent ledger entries first
    pub async fn history(&self, account_id: &str, limit: i64) -> Result<Vec<Transaction>, DatabaseError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT id, account_id, symbol, quantity, unit_price, total, executed_at
            FROM transactions
            WHERE account_id = ?1
            ORDER BY executed_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("Failed to get transaction history", e))?;

        records.into_iter().map(Transaction::try_from).collect()
    }
}

/// Stock listing repository
#[derive(Clone)]
pub struct StockRepository {
    pool: DbPool,
}

impl StockRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Homepage listing ordered by rank
    pub async fn top_ranked(&self) -> Result<Vec<ListedStock>, DatabaseError> {
        let records = sqlx::query_as::<_, StockRecord>(
            r#"
            SELECT symbol, name, price, top_rank, updated_at
            FROM stocks
            WHERE top_rank IS NOT NULL
            ORDER BY top_rank
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("Failed to get top ranked stocks", e))?;

        records.into_iter().map(ListedStock::try_from).collect()
    }

    /// Every known symbol with its name, alphabetically
    pub async fn symbols(&self) -> Result<Vec<(String, Option<String>)>, DatabaseError> {
        sqlx::query_as("SELECT symbol, name FROM stocks ORDER BY symbol")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error("Failed to list symbols", e))
    }

    /// Replace the ranked listing: every existing rank is cleared and the
    /// given stocks are upserted with their new rank, atomically.
    pub async fn replace_top_ranks(&self, stocks: &[RankedStock]) -> Result<usize, DatabaseError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_error("Failed to begin rank refresh", e))?;

        sqlx::query("UPDATE stocks SET top_rank = NULL WHERE top_rank IS NOT NULL")
            .execute(&mut *tx)
            .await
            .map_err(|e| query_error("Failed to clear ranks", e))?;

        let now = Utc::now();
        for stock in stocks {
            sqlx::query(
                r#"
                INSERT INTO stocks (symbol, name, price, top_rank, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(symbol) DO UPDATE SET
                    name = COALESCE(excluded.name, stocks.name),
                    price = excluded.price,
                    top_rank = excluded.top_rank,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&stock.symbol)
            .bind(&stock.name)
            .bind(stock.price.to_string())
            .bind(stock.top_rank)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| query_error("Failed to upsert stock", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| query_error("Failed to commit rank refresh", e))?;

        debug!("Stored {} ranked stocks", stocks.len());
        Ok(stocks.len())
    }
}

/// Login session repository
#[derive(Clone)]
pub struct SessionRepository {
    pool: DbPool,
}

impl SessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        account_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRecord, DatabaseError> {
        sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO sessions (id, account_id, created_at, expires_at, revoked)
            VALUES (?1, ?2, ?3, ?4, 0)
            RETURNING id, account_id, created_at, expires_at, revoked
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(account_id)
        .bind(Utc::now())
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| query_error("Failed to create session", e))
    }

    pub async fn get(&self, id: &str) -> Result<Option<SessionRecord>, DatabaseError> {
        sqlx::query_as::<_, SessionRecord>(
            "SELECT id, account_id, created_at, expires_at, revoked FROM sessions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("Failed to get session", e))
    }

    /// Returns whether a live session was revoked
    pub async fn revoke(&self, id: &str) -> Result<bool, DatabaseError> {
        let rows = sqlx::query("UPDATE sessions SET revoked = 1 WHERE id = ?1 AND revoked = 0")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("Failed to revoke session", e))?
            .rows_affected();
        Ok(rows > 0)
    }

    /// Delete sessions that expired or were revoked before `cutoff`
    pub async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let rows = sqlx::query("DELETE FROM sessions WHERE expires_at < ?1 OR revoked = 1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("Failed to purge sessions", e))?
            .rows_affected();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::trade_settlement::TradeRequest;
    use crate::domain::value_objects::price::Price;
    use crate::domain::value_objects::quantity::Quantity;
    use crate::domain::value_objects::symbol::Symbol;
    use crate::persistence::{init_database, DatabaseConfig};
    use rust_decimal::Decimal;

    async fn setup() -> (DbPool, UserAccount) {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let account = AccountRepository::new(pool.clone())
            .create(CreateAccount {
                email: "trader@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Trader".to_string(),
                password_hash: "hash".to_string(),
                balance: Decimal::from(1000),
            })
            .await
            .unwrap();
        (pool, account)
    }

    fn intent(symbol: &str, quantity: i64, price: i64) -> TradeIntent {
        TradeRequest {
            symbol: Symbol::parse(symbol).unwrap(),
            quantity: Quantity::new(quantity).unwrap(),
        }
        .priced_at(Price::new(Decimal::from(price)).unwrap())
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let (pool, _) = setup().await;
        let result = AccountRepository::new(pool)
            .create(CreateAccount {
                email: "trader@example.com".to_string(),
                first_name: "Other".to_string(),
                last_name: "Person".to_string(),
                password_hash: "hash".to_string(),
                balance: Decimal::from(1000),
            })
            .await;
        assert!(matches!(result, Err(DatabaseError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn test_buy_then_sell_updates_balance_and_ledger() {
        let (pool, account) = setup().await;
        let ledger = LedgerRepository::new(pool.clone());
        let accounts = AccountRepository::new(pool);

        let bought = ledger
            .settle(&account.id, TradeSide::Buy, &intent("AAPL", 5, 150))
            .await
            .unwrap();
        assert_eq!(bought.new_balance, Decimal::from(250));

        let sold = ledger
            .settle(&account.id, TradeSide::Sell, &intent("AAPL", 3, 160))
            .await
            .unwrap();
        assert_eq!(sold.new_balance, Decimal::from(730));

        let stored = accounts.get(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::from(730));
        assert_eq!(stored.version, 2);

        let history = ledger.history(&account.id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        let quantities: Vec<i64> = history.iter().map(|t| t.quantity).collect();
        assert!(quantities.contains(&5));
        assert!(quantities.contains(&-3));
        let sell = history.iter().find(|t| t.quantity == -3).unwrap();
        assert_eq!(sell.unit_price, Decimal::from(160));
        assert_eq!(sell.total, Decimal::from(480));

        assert_eq!(
            ledger.holdings(&account.id).await.unwrap(),
            vec![Holding {
                symbol: "AAPL".to_string(),
                quantity: 2
            }]
        );
    }

    #[tokio::test]
    async fn test_rejected_buy_leaves_no_trace() {
        let (pool, account) = setup().await;
        let ledger = LedgerRepository::new(pool.clone());

        let err = ledger
            .settle(&account.id, TradeSide::Buy, &intent("AAPL", 10, 150))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::InsufficientFunds { .. }));

        let stored = AccountRepository::new(pool).get(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::from(1000));
        assert_eq!(stored.version, 0);
        assert!(ledger.history(&account.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_sell_leaves_no_trace() {
        let (pool, account) = setup().await;
        let ledger = LedgerRepository::new(pool.clone());

        let err = ledger
            .settle(&account.id, TradeSide::Sell, &intent("AAPL", 1, 150))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::InsufficientHoldings { owned: 0, .. }));

        let stored = AccountRepository::new(pool).get(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::from(1000));
        assert!(ledger.history(&account.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settle_unknown_account() {
        let (pool, _) = setup().await;
        let err = LedgerRepository::new(pool)
            .settle("missing", TradeSide::Buy, &intent("AAPL", 1, 1))
            .await
            .unwrap_err();
        assert_eq!(err, TradeError::AccountNotFound("missing".to_string()));
    }

    /// On-disk database so that concurrent settlements really race on
    /// separate connections
    async fn file_setup(balance: i64) -> (tempfile::TempDir, DbPool, UserAccount) {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("ledger.db").display()),
            max_connections: 5,
            log_queries: false,
        };
        let pool = init_database(&config).await.unwrap();
        let account = AccountRepository::new(pool.clone())
            .create(CreateAccount {
                email: "racer@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Racer".to_string(),
                password_hash: "hash".to_string(),
                balance: Decimal::from(balance),
            })
            .await
            .unwrap();
        (dir, pool, account)
    }

    async fn settle_concurrently(
        pool: &DbPool,
        account_id: &str,
        orders: usize,
        order: TradeIntent,
    ) -> Vec<Result<SettlementOutcome, TradeError>> {
        let ledger = LedgerRepository::new(pool.clone());
        let handles: Vec<_> = (0..orders)
            .map(|_| {
                let ledger = ledger.clone();
                let account_id = account_id.to_string();
                let order = order.clone();
                tokio::spawn(async move { ledger.settle(&account_id, TradeSide::Buy, &order).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    #[tokio::test]
    async fn test_concurrent_buys_with_ample_funds_all_settle() {
        let (_dir, pool, account) = file_setup(100_000).await;

        let results = settle_concurrently(&pool, &account.id, 8, intent("AAPL", 1, 10)).await;
        for result in &results {
            assert!(result.is_ok(), "settlement failed: {:?}", result);
        }

        let stored = AccountRepository::new(pool.clone()).get(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::from(100_000 - 80));
        let holdings = LedgerRepository::new(pool).holdings(&account.id).await.unwrap();
        assert_eq!(holdings[0].quantity, 8);
    }

    #[tokio::test]
    async fn test_concurrent_buys_cannot_overdraw() {
        let (_dir, pool, account) = file_setup(1000).await;

        // Each buy costs 600 of the 1000 balance: only one may succeed.
        let results = settle_concurrently(&pool, &account.id, 4, intent("MSFT", 2, 300)).await;

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        for result in results.iter().filter(|r| r.is_err()) {
            assert!(
                matches!(
                    result,
                    Err(TradeError::InsufficientFunds { .. }) | Err(TradeError::Conflict { .. })
                ),
                "unexpected outcome: {:?}",
                result
            );
        }

        let stored = AccountRepository::new(pool).get(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::from(400));
    }

    #[tokio::test]
    async fn test_replace_top_ranks() {
        let (pool, _) = setup().await;
        let stocks = StockRepository::new(pool);

        let first = vec![
            RankedStock {
                symbol: "AAPL".to_string(),
                name: Some("Apple Inc.".to_string()),
                price: Decimal::from(150),
                top_rank: 1,
            },
            RankedStock {
                symbol: "MSFT".to_string(),
                name: None,
                price: Decimal::from(300),
                top_rank: 2,
            },
        ];
        assert_eq!(stocks.replace_top_ranks(&first).await.unwrap(), 2);

        let second = vec![RankedStock {
            symbol: "MSFT".to_string(),
            name: Some("Microsoft".to_string()),
            price: Decimal::from(310),
            top_rank: 1,
        }];
        stocks.replace_top_ranks(&second).await.unwrap();

        let listed = stocks.top_ranked().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].symbol, "MSFT");
        assert_eq!(listed[0].price, Decimal::from(310));

        // Unranked rows stay known for the trade page.
        let symbols = stocks.symbols().await.unwrap();
        assert_eq!(
            symbols,
            vec![
                ("AAPL".to_string(), Some("Apple Inc.".to_string())),
                ("MSFT".to_string(), Some("Microsoft".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (pool, account) = setup().await;
        let sessions = SessionRepository::new(pool);

        let session = sessions
            .create(&account.id, Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        let loaded = sessions.get(&session.id).await.unwrap().unwrap();
        assert!(loaded.is_active(Utc::now()));

        assert!(sessions.revoke(&session.id).await.unwrap());
        assert!(!sessions.revoke(&session.id).await.unwrap());
        let loaded = sessions.get(&session.id).await.unwrap().unwrap();
        assert!(!loaded.is_active(Utc::now()));

        assert_eq!(sessions.purge_expired(Utc::now()).await.unwrap(), 1);
        assert!(sessions.get(&session.id).await.unwrap().is_none());
    }
}
