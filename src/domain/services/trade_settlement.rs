//! Trade settlement rules
//!
//! Turns a submitted order form into a priced [`TradeIntent`] and decides,
//! without touching storage, what a buy or sell does to an account. The
//! ledger repository runs these checks inside a database transaction so the
//! read, the check and the write cannot interleave with another request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::entities::transaction::TradeSide;
use crate::domain::errors::TradeError;
use crate::domain::value_objects::price::Price;
use crate::domain::value_objects::quantity::Quantity;
use crate::domain::value_objects::symbol::Symbol;

/// Raw order form as posted to `/buy` or `/sell`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeParams {
    pub symbol: Option<String>,
    pub quantity: Option<String>,
}

/// Parsed but not yet priced order.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub symbol: Symbol,
    pub quantity: Quantity,
}

/// Order priced at the current quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeIntent {
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub unit_price: Price,
    pub total_price: Decimal,
}

/// Result of an accepted trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementOutcome {
    pub side: TradeSide,
    pub transaction_id: String,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub unit_price: Price,
    pub total_price: Decimal,
    pub new_balance: Decimal,
}

impl SettlementOutcome {
    /// Confirmation shown on the trade page.
    pub fn message(&self) -> String {
        format!(
            "You have {} {} {} for a price {:.2}\n your current balance is: {:.2}",
            self.side.past_tense(),
            self.quantity,
            self.symbol,
            self.total_price,
            self.new_balance
        )
    }
}

impl TradeParams {
    /// Parse symbol and quantity from the form.
    pub fn parse(&self) -> Result<TradeRequest, TradeError> {
        let symbol = self
            .symbol
            .as_deref()
            .ok_or_else(|| TradeError::invalid("symbol is missing"))?;
        let quantity = self
            .quantity
            .as_deref()
            .ok_or_else(|| TradeError::invalid("quantity is missing"))?;

        Ok(TradeRequest {
            symbol: Symbol::parse(symbol).map_err(TradeError::invalid)?,
            quantity: Quantity::parse(quantity).map_err(TradeError::invalid)?,
        })
    }
}

impl TradeRequest {
    /// Attach the current unit price and compute the order total.
    pub fn priced_at(self, unit_price: Price) -> Result<TradeIntent, TradeError> {
        let total_price = unit_price
            .total_for(self.quantity)
            .map_err(TradeError::invalid)?;
        Ok(TradeIntent {
            symbol: self.symbol,
            quantity: self.quantity,
            unit_price,
            total_price,
        })
    }
}

/// Balance after buying `intent`, or `InsufficientFunds`.
pub fn check_buy(balance: Decimal, intent: &TradeIntent) -> Result<Decimal, TradeError> {
    if intent.total_price > balance {
        return Err(TradeError::InsufficientFunds {
            required: intent.total_price,
            available: balance,
        });
    }
    Ok(balance - intent.total_price)
}

/// Balance after selling `intent` given the shares currently `owned`, or
/// `InsufficientHoldings`.
pub fn check_sell(balance: Decimal, owned: i64, intent: &TradeIntent) -> Result<Decimal, TradeError> {
    if owned < intent.quantity.value() {
        return Err(TradeError::InsufficientHoldings {
            symbol: intent.symbol.to_string(),
            requested: intent.quantity.value(),
            owned,
        });
    }
    balance
        .checked_add(intent.total_price)
        .ok_or_else(|| TradeError::invalid("balance overflow"))
}

/// Dispatch to [`check_buy`] or [`check_sell`].
pub fn check_trade(
    side: TradeSide,
    balance: Decimal,
    owned: i64,
    intent: &TradeIntent,
) -> Result<Decimal, TradeError> {
    match side {
        TradeSide::Buy => check_buy(balance, intent),
        TradeSide::Sell => check_sell(balance, owned, intent),
    }
}
