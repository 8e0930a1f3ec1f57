//! In-process provider serving fixed quotes
//!
//! Used when no market data token is configured, so the service can run
//! offline, and by tests as a controllable stand-in for the HTTP provider.

use async_trait::async_trait;
use chrono::{Datelike, Duration, Utc, Weekday};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::stock_api::{HistoricRange, ProviderError, ProviderResult, StockDataProvider};
use crate::domain::entities::stock::{HistoricSnapshot, StockQuote};
use crate::domain::value_objects::symbol::Symbol;

const DEMO_QUOTES: &[(&str, &str, &str)] = &[
    ("AAPL", "Apple Inc.", "189.84"),
    ("MSFT", "Microsoft Corporation", "374.51"),
    ("AMZN", "Amazon.com, Inc.", "146.88"),
    ("GOOGL", "Alphabet Inc.", "133.32"),
    ("TSLA", "Tesla, Inc.", "240.08"),
    ("NVDA", "NVIDIA Corporation", "467.65"),
    ("META", "Meta Platforms, Inc.", "326.49"),
    ("AMD", "Advanced Micro Devices, Inc.", "122.65"),
];

pub struct SampleStockProvider {
    /// Insertion order doubles as the most-active ranking
    quotes: Mutex<Vec<StockQuote>>,
    unavailable: AtomicBool,
    quote_calls: AtomicUsize,
}

impl SampleStockProvider {
    /// A handful of large caps at fixed prices
    pub fn demo() -> Self {
        let quotes = DEMO_QUOTES
            .iter()
            .filter_map(|(symbol, name, price)| {
                Some(StockQuote {
                    symbol: symbol.to_string(),
                    company_name: Some(name.to_string()),
                    latest_price: Decimal::from_str(price).ok()?,
                    change_percent: None,
                    latest_update: None,
                })
            })
            .collect();
        Self::from_quotes(quotes)
    }

    /// Quotes from `(symbol, price)` pairs; unparsable prices are skipped
    pub fn with_quotes(pairs: &[(&str, &str)]) -> Self {
        let quotes = pairs
            .iter()
            .filter_map(|(symbol, price)| {
                Some(StockQuote {
                    symbol: symbol.to_ascii_uppercase(),
                    company_name: None,
                    latest_price: Decimal::from_str(price).ok()?,
                    change_percent: None,
                    latest_update: None,
                })
            })
            .collect();
        Self::from_quotes(quotes)
    }

    fn from_quotes(quotes: Vec<StockQuote>) -> Self {
        Self {
            quotes: Mutex::new(quotes),
            unavailable: AtomicBool::new(false),
            quote_calls: AtomicUsize::new(0),
        }
    }

    fn quotes(&self) -> MutexGuard<'_, Vec<StockQuote>> {
        self.quotes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Change (or add) the price served for `symbol`
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        let symbol = symbol.to_ascii_uppercase();
        let mut quotes = self.quotes();
        match quotes.iter_mut().find(|q| q.symbol == symbol) {
            Some(quote) => quote.latest_price = price,
            None => quotes.push(StockQuote {
                symbol,
                company_name: None,
                latest_price: price,
                change_percent: None,
                latest_update: None,
            }),
        }
    }

    /// Make every call fail as if the provider were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `quote` calls served so far
    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> ProviderResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ProviderError::Transport("sample provider switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

fn trading_days(range: HistoricRange) -> usize {
    match range {
        HistoricRange::OneMonth => 21,
    }
}

#[async_trait]
impl StockDataProvider for SampleStockProvider {
    async fn quote(&self, symbol: &Symbol) -> ProviderResult<StockQuote> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.quotes()
            .iter()
            .find(|q| q.symbol == symbol.as_str())
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
    }

    /// A flat series at the current price, one point per weekday
    async fn historic(&self, symbol: &Symbol, range: HistoricRange) -> ProviderResult<Vec<HistoricSnapshot>> {
        self.check_available()?;
        let price = self
            .quotes()
            .iter()
            .find(|q| q.symbol == symbol.as_str())
            .map(|q| q.latest_price)
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

        let mut days = BTreeMap::new();
        let mut day = Utc::now().date_naive();
        while days.len() < trading_days(range) {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                days.insert(day, ());
            }
            day -= Duration::days(1);
        }

        Ok(days
            .into_keys()
            .map(|date| HistoricSnapshot {
                date: date.format("%Y-%m-%d").to_string(),
                open: Some(price),
                high: Some(price),
                low: Some(price),
                close: Some(price),
                volume: Some(0),
                change_percent: Some(0.0),
            })
            .collect())
    }

    async fn most_active(&self) -> ProviderResult<Vec<StockQuote>> {
        self.check_available()?;
        Ok(self.quotes().clone())
    }
}
