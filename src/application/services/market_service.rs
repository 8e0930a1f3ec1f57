//! Quotes, price history and the homepage listing

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::entities::stock::{HistoricSnapshot, ListedStock, StockQuote};
use crate::domain::value_objects::symbol::Symbol;
use crate::infrastructure::stock_api::{HistoricRange, ProviderError, StockDataProvider};
use crate::persistence::models::RankedStock;
use crate::persistence::repository::StockRepository;
use crate::persistence::{DatabaseError, DbPool};

/// Range served by the public history endpoint
pub const HISTORIC_RANGE: HistoricRange = HistoricRange::OneMonth;

#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error(transparent)]
    Provider(ProviderError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<ProviderError> for MarketError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotFound(symbol) => MarketError::UnknownSymbol(symbol),
            other => MarketError::Provider(other),
        }
    }
}

/// Entry of the symbol picker on the trade pages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockListEntry {
    pub symbol: String,
    pub name: Option<String>,
}

pub struct MarketService {
    provider: Arc<dyn StockDataProvider>,
    stocks: StockRepository,
    top_list_size: usize,
}

impl MarketService {
    pub fn new(provider: Arc<dyn StockDataProvider>, pool: DbPool, top_list_size: usize) -> Self {
        Self {
            provider,
            stocks: StockRepository::new(pool),
            top_list_size,
        }
    }

    fn parse_symbol(raw: &str) -> Result<Symbol, MarketError> {
        Symbol::parse(raw).map_err(|e| {
            debug!("Rejected symbol {:?}: {}", raw, e);
            MarketError::UnknownSymbol(raw.trim().to_ascii_uppercase())
        })
    }

    pub async fn quote(&self, raw_symbol: &str) -> Result<StockQuote, MarketError> {
        let symbol = Self::parse_symbol(raw_symbol)?;
        Ok(self.provider.quote(&symbol).await?)
    }

    /// One month of daily snapshots, oldest first
    pub async fn historic(&self, raw_symbol: &str) -> Result<Vec<HistoricSnapshot>, MarketError> {
        let symbol = Self::parse_symbol(raw_symbol)?;
        Ok(self.provider.historic(&symbol, HISTORIC_RANGE).await?)
    }

    /// Ranked stocks for the homepage, best rank first
    pub async fn top_stocks(&self) -> Result<Vec<ListedStock>, MarketError> {
        Ok(self.stocks.top_ranked().await?)
    }

    /// Every known stock, for the trade pages
    pub async fn stock_list(&self) -> Result<Vec<StockListEntry>, MarketError> {
        Ok(self
            .stocks
            .symbols()
            .await?
            .into_iter()
            .map(|(symbol, name)| StockListEntry { symbol, name })
            .collect())
    }

    /// Replace the stored ranking with the provider's current most-active list
    pub async fn refresh_top_ranks(&self) -> Result<usize, MarketError> {
        let quotes = self.provider.most_active().await?;
        let ranked: Vec<RankedStock> = quotes
            .into_iter()
            .take(self.top_list_size)
            .zip(1..)
            .map(|(quote, rank)| RankedStock {
                symbol: quote.symbol,
                name: quote.company_name,
                price: quote.latest_price,
                top_rank: rank,
            })
            .collect();

        let stored = self.stocks.replace_top_ranks(&ranked).await?;
        info!("Refreshed top stocks: {} ranked", stored);
        Ok(stored)
    }
}
