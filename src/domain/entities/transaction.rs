//! Ledger entries and the holdings derived from them

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::quantity::Quantity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Quantity as recorded in the ledger: positive for buys, negative for sells.
    pub fn signed(&self, quantity: Quantity) -> i64 {
        match self {
            TradeSide::Buy => quantity.value(),
            TradeSide::Sell => -quantity.value(),
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            TradeSide::Buy => "bought",
            TradeSide::Sell => "sold",
        }
    }
}

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub symbol: String,
    /// Signed share count
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl Transaction {
    pub fn side(&self) -> TradeSide {
        if self.quantity < 0 {
            TradeSide::Sell
        } else {
            TradeSide::Buy
        }
    }
}

/// Net position in one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_quantity() {
        let q = Quantity::new(3).unwrap();
        assert_eq!(TradeSide::Buy.signed(q), 3);
        assert_eq!(TradeSide::Sell.signed(q), -3);
    }

    #[test]
    fn test_side_from_sign() {
        let txn = Transaction {
            id: "t".to_string(),
            account_id: "a".to_string(),
            symbol: "AAPL".to_string(),
            quantity: -3,
            unit_price: Decimal::from(160),
            total: Decimal::from(480),
            executed_at: Utc::now(),
        };
        assert_eq!(txn.side(), TradeSide::Sell);
    }
}
