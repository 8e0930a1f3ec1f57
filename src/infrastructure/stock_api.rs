//! Market data provider
//!
//! `StockDataProvider` is the seam between the web handlers and whatever
//! supplies prices. `HttpStockProvider` talks to an IEX-compatible REST API:
//!
//! - `GET {base}/stock/{symbol}/quote`
//! - `GET {base}/stock/{symbol}/chart/{range}`
//! - `GET {base}/stock/market/list/mostactive`
//!
//! every request carrying the API token as the `token` query parameter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::domain::entities::stock::{HistoricSnapshot, StockQuote};
use crate::domain::value_objects::symbol::Symbol;

/// Errors from the market data provider
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ProviderError {
    #[error("Unknown symbol: {0}")]
    NotFound(String),

    #[error("Provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    Decode(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// How far back a historic series goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoricRange {
    OneMonth,
}

impl HistoricRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoricRange::OneMonth => "1m",
        }
    }
}

/// Source of quotes and price history
#[async_trait]
pub trait StockDataProvider: Send + Sync {
    /// Latest quote for one symbol
    async fn quote(&self, symbol: &Symbol) -> ProviderResult<StockQuote>;

    /// Daily snapshots covering `range`, oldest first
    async fn historic(&self, symbol: &Symbol, range: HistoricRange) -> ProviderResult<Vec<HistoricSnapshot>>;

    /// Most actively traded stocks, busiest first
    async fn most_active(&self) -> ProviderResult<Vec<StockQuote>>;
}

/// Quote as returned by the provider
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteDto {
    symbol: String,
    company_name: Option<String>,
    latest_price: Option<Decimal>,
    change_percent: Option<f64>,
    /// Epoch milliseconds
    latest_update: Option<i64>,
}

/// Chart point as returned by the provider
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartPointDto {
    date: String,
    open: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Option<Decimal>,
    volume: Option<u64>,
    change_percent: Option<f64>,
}

impl TryFrom<QuoteDto> for StockQuote {
    type Error = ProviderError;

    fn try_from(dto: QuoteDto) -> Result<Self, Self::Error> {
        let latest_price = dto
            .latest_price
            .ok_or_else(|| ProviderError::Decode(format!("quote for {} has no latestPrice", dto.symbol)))?;
        Ok(StockQuote {
            symbol: dto.symbol.to_ascii_uppercase(),
            company_name: dto.company_name.filter(|n| !n.is_empty()),
            latest_price,
            change_percent: dto.change_percent,
            latest_update: dto.latest_update.and_then(DateTime::<Utc>::from_timestamp_millis),
        })
    }
}

impl From<ChartPointDto> for HistoricSnapshot {
    fn from(dto: ChartPointDto) -> Self {
        HistoricSnapshot {
            date: dto.date,
            open: dto.open,
            high: dto.high,
            low: dto.low,
            close: dto.close,
            volume: dto.volume,
            change_percent: dto.change_percent,
        }
    }
}

pub(crate) fn parse_quote(body: &str) -> ProviderResult<StockQuote> {
    let dto: QuoteDto = serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    StockQuote::try_from(dto)
}

pub(crate) fn parse_chart(body: &str) -> ProviderResult<Vec<HistoricSnapshot>> {
    let points: Vec<ChartPointDto> =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(points.into_iter().map(HistoricSnapshot::from).collect())
}

/// Quotes without a price are skipped rather than failing the whole list.
pub(crate) fn parse_quote_list(body: &str) -> ProviderResult<Vec<StockQuote>> {
    let dtos: Vec<QuoteDto> = serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(dtos
        .into_iter()
        .filter_map(|dto| match StockQuote::try_from(dto) {
            Ok(quote) => Some(quote),
            Err(e) => {
                warn!("Skipping most-active entry: {}", e);
                None
            }
        })
        .collect())
}

/// Client for an IEX-compatible REST API
pub struct HttpStockProvider {
    client: Client,
    base_url: String,
    token: Zeroizing<String>,
}

impl HttpStockProvider {
    pub fn new(base_url: &str, token: Zeroizing<String>, timeout: Duration) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Fetch `path` and return the body of a successful response
    async fn get(&self, path: &str, subject: &str) -> ProviderResult<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(subject.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Market data request for {} failed: HTTP {}", subject, status);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.without_url().to_string()))
    }
}

#[async_trait]
impl StockDataProvider for HttpStockProvider {
    async fn quote(&self, symbol: &Symbol) -> ProviderResult<StockQuote> {
        let body = self
            .get(&format!("/stock/{}/quote", symbol), symbol.as_str())
            .await?;
        parse_quote(&body)
    }

    async fn historic(&self, symbol: &Symbol, range: HistoricRange) -> ProviderResult<Vec<HistoricSnapshot>> {
        let body = self
            .get(
                &format!("/stock/{}/chart/{}", symbol, range.as_str()),
                symbol.as_str(),
            )
            .await?;
        parse_chart(&body)
    }

    async fn most_active(&self) -> ProviderResult<Vec<StockQuote>> {
        let body = self.get("/stock/market/list/mostactive", "mostactive").await?;
        parse_quote_list(&body)
    }
}
