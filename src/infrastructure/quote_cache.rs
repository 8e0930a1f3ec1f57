//! Short-lived quote cache in front of a provider

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use super::stock_api::{HistoricRange, ProviderResult, StockDataProvider};
use crate::domain::entities::stock::{HistoricSnapshot, StockQuote};
use crate::domain::value_objects::symbol::Symbol;

/// Wraps a provider and reuses quotes younger than `ttl`. History and the
/// most-active list are passed through; the list also refreshes the cache.
pub struct CachedProvider {
    inner: Arc<dyn StockDataProvider>,
    ttl: Duration,
    quotes: Mutex<LruCache<Symbol, (Instant, StockQuote)>>, // bounded so unknown symbols cannot grow it
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn StockDataProvider>, ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            ttl,
            quotes: Mutex::new(LruCache::new(capacity)),
        }
    }

    async fn cached(&self, symbol: &Symbol) -> Option<StockQuote> {
        let mut quotes = self.quotes.lock().await;
        let fresh = quotes
            .get(symbol)
            .filter(|(fetched_at, _)| fetched_at.elapsed() <= self.ttl)
            .map(|(_, quote)| quote.clone());
        if fresh.is_none() {
            quotes.pop(symbol);
        }
        fresh
    }

    async fn store(&self, quote: &StockQuote) {
        if let Ok(symbol) = Symbol::parse(&quote.symbol) {
            self.quotes
                .lock()
                .await
                .put(symbol, (Instant::now(), quote.clone()));
        }
    }
}

#[async_trait]
impl StockDataProvider for CachedProvider {
    async fn quote(&self, symbol: &Symbol) -> ProviderResult<StockQuote> {
        if let Some(quote) = self.cached(symbol).await {
            debug!("Quote cache hit for {}", symbol);
            return Ok(quote);
        }
        let quote = self.inner.quote(symbol).await?;
        self.store(&quote).await;
        Ok(quote)
    }

    async fn historic(&self, symbol: &Symbol, range: HistoricRange) -> ProviderResult<Vec<HistoricSnapshot>> {
        self.inner.historic(symbol, range).await
    }

    async fn most_active(&self) -> ProviderResult<Vec<StockQuote>> {
        let quotes = self.inner.most_active().await?;
        for quote in &quotes {
            self.store(quote).await;
        }
        Ok(quotes)
    }
}
