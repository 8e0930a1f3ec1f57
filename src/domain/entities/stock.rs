use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current price and metadata for one symbol, as reported by the market
/// data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub company_name: Option<String>,
    pub latest_price: Decimal,
    pub change_percent: Option<f64>,
    pub latest_update: Option<DateTime<Utc>>,
}

/// One point of a historic price series, usually one per trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricSnapshot {
    pub date: String,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<u64>,
    pub change_percent: Option<f64>,
}

/// Row of the homepage listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedStock {
    pub symbol: String,
    pub name: Option<String>,
    pub price: Decimal,
    pub top_rank: i64,
    pub updated_at: DateTime<Utc>,
}
