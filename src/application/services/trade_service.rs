//! Buy and sell orders against the simulated ledger

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::entities::transaction::{Holding, TradeSide, Transaction};
use crate::domain::errors::TradeError;
use crate::domain::services::trade_settlement::{SettlementOutcome, TradeIntent, TradeParams};
use crate::domain::value_objects::price::Price;
use crate::infrastructure::stock_api::{ProviderError, StockDataProvider};
use crate::persistence::repository::{AccountRepository, LedgerRepository};
use crate::persistence::DbPool;

/// Ledger rows shown on the portfolio page
pub const PORTFOLIO_HISTORY_LIMIT: i64 = 50;

/// Cash, positions and recent activity of one account
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub balance: Decimal,
    pub holdings: Vec<Holding>,
    pub transactions: Vec<Transaction>,
}

pub struct TradeService {
    provider: Arc<dyn StockDataProvider>,
    accounts: AccountRepository,
    ledger: LedgerRepository,
}

impl TradeService {
    pub fn new(provider: Arc<dyn StockDataProvider>, pool: DbPool) -> Self {
        Self {
            provider,
            accounts: AccountRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool),
        }
    }

    /// Parse the order form and price it at the current quote
    pub async fn extract_info(&self, params: &TradeParams) -> Result<TradeIntent, TradeError> {
        let request = params.parse()?;

        let quote = self.provider.quote(&request.symbol).await.map_err(|e| {
            match &e {
                ProviderError::NotFound(_) => debug!("No quote for {}", request.symbol),
                _ => warn!("Quote lookup for {} failed: {}", request.symbol, e),
            }
            TradeError::QuoteUnavailable {
                symbol: request.symbol.to_string(),
                reason: e.to_string(),
            }
        })?;
        let unit_price = Price::new(quote.latest_price).map_err(|reason| TradeError::QuoteUnavailable {
            symbol: request.symbol.to_string(),
            reason,
        })?;

        request.priced_at(unit_price)
    }

    pub async fn buy(&self, account_id: &str, params: &TradeParams) -> Result<SettlementOutcome, TradeError> {
        self.trade(account_id, TradeSide::Buy, params).await
    }

    pub async fn sell(&self, account_id: &str, params: &TradeParams) -> Result<SettlementOutcome, TradeError> {
        self.trade(account_id, TradeSide::Sell, params).await
    }

    async fn trade(
        &self,
        account_id: &str,
        side: TradeSide,
        params: &TradeParams,
    ) -> Result<SettlementOutcome, TradeError> {
        let result = match self.extract_info(params).await {
            Ok(intent) => self.ledger.settle(account_id, side, &intent).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => info!(
                "Account {} {} {} {} at {} (balance {})",
                account_id,
                side.past_tense(),
                outcome.quantity,
                outcome.symbol,
                outcome.unit_price,
                outcome.new_balance
            ),
            Err(e) if e.is_rejection() => debug!("{:?} rejected for {}: {}", side, account_id, e),
            Err(e) => warn!("{:?} failed for {} [{}]: {}", side, account_id, e.error_code(), e),
        }
        result
    }

    pub async fn portfolio(&self, account_id: &str) -> Result<Portfolio, TradeError> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or_else(|| TradeError::AccountNotFound(account_id.to_string()))?;

        Ok(Portfolio {
            balance: account.balance,
            holdings: self.ledger.holdings(account_id).await?,
            transactions: self.ledger.history(account_id, PORTFOLIO_HISTORY_LIMIT).await?,
        })
    }
}
