//! Database Models
//!
//! Row types as stored in SQLite. Money columns are TEXT so that decimals
//! survive the round trip exactly; conversion into domain types happens in
//! the `TryFrom` impls below.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::str::FromStr;

use super::DatabaseError;
use crate::domain::entities::account::UserAccount;
use crate::domain::entities::stock::ListedStock;
use crate::domain::entities::transaction::{Holding, Transaction};

/// Account record in database
#[derive(Debug, Clone, FromRow)]
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub balance: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// Transaction record in database
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRecord {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    pub quantity: i64,
    pub unit_price: String,
    pub total: String,
    pub executed_at: DateTime<Utc>,
}

/// Listed stock record in database
#[derive(Debug, Clone, FromRow)]
pub struct StockRecord {
    pub symbol: String,
    pub name: Option<String>,
    pub price: String,
    pub top_rank: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Session record in database
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl SessionRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct HoldingRecord {
    pub symbol: String,
    pub quantity: i64,
}

/// Create account input
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub balance: Decimal,
}

/// Upsert input for the listing refresh
#[derive(Debug, Clone)]
pub struct RankedStock {
    pub symbol: String,
    pub name: Option<String>,
    pub price: Decimal,
    pub top_rank: i64,
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, DatabaseError> {
    Decimal::from_str(raw)
        .map_err(|e| DatabaseError::CorruptRow(format!("{} is not a decimal ({:?}): {}", column, raw, e)))
}

impl TryFrom<AccountRecord> for UserAccount {
    type Error = DatabaseError;

    fn try_from(record: AccountRecord) -> Result<Self, Self::Error> {
        Ok(UserAccount {
            balance: parse_decimal("accounts.balance", &record.balance)?,
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            version: record.version,
            created_at: record.created_at,
        })
    }
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = DatabaseError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        Ok(Transaction {
            unit_price: parse_decimal("transactions.unit_price", &record.unit_price)?,
            total: parse_decimal("transactions.total", &record.total)?,
            id: record.id,
            account_id: record.account_id,
            symbol: record.symbol,
            quantity: record.quantity,
            executed_at: record.executed_at,
        })
    }
}

impl TryFrom<StockRecord> for ListedStock {
    type Error = DatabaseError;

    fn try_from(record: StockRecord) -> Result<Self, Self::Error> {
        let top_rank = record.top_rank.ok_or_else(|| {
            DatabaseError::CorruptRow(format!("{} has no top_rank", record.symbol))
        })?;
        Ok(ListedStock {
            price: parse_decimal("stocks.price", &record.price)?,
            symbol: record.symbol,
            name: record.name,
            top_rank,
            updated_at: record.updated_at,
        })
    }
}

impl From<HoldingRecord> for Holding {
    fn from(record: HoldingRecord) -> Self {
        Holding {
            symbol: record.symbol,
            quantity: record.quantity,
        }
    }
}
