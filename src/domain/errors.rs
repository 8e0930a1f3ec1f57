use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a buy or sell order is refused or fails to settle.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TradeError {
    /// Symbol or quantity missing or malformed
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Order total exceeds the cash balance
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    /// Selling more shares than the ledger shows as owned
    #[error("Insufficient holdings of {symbol}: requested {requested}, owned {owned}")]
    InsufficientHoldings {
        symbol: String,
        requested: i64,
        owned: i64,
    },

    /// No current price could be obtained for the symbol
    #[error("Quote unavailable for {symbol}: {reason}")]
    QuoteUnavailable { symbol: String, reason: String },

    /// The account changed under us on every retry
    #[error("Account {account_id} was modified concurrently")]
    Conflict { account_id: String },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl TradeError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        TradeError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Short message shown inline on the trade page.
    pub fn user_message(&self) -> String {
        match self {
            TradeError::InvalidInput { .. } => "Invalid input".to_string(),
            TradeError::InsufficientFunds { .. } => "not enough balance".to_string(),
            TradeError::InsufficientHoldings { .. } => "Not enough stocks to sell".to_string(),
            TradeError::QuoteUnavailable { symbol, .. } => {
                format!("Could not get a price for {}", symbol)
            }
            TradeError::Conflict { .. } => {
                "Your account was updated by another request, please try again".to_string()
            }
            TradeError::AccountNotFound(_) | TradeError::Storage(_) => {
                "The trade could not be processed".to_string()
            }
        }
    }

    /// Get a short error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            TradeError::InvalidInput { .. } => "ERR_INVALID_INPUT",
            TradeError::InsufficientFunds { .. } => "ERR_INSUFFICIENT_FUNDS",
            TradeError::InsufficientHoldings { .. } => "ERR_INSUFFICIENT_HOLDINGS",
            TradeError::QuoteUnavailable { .. } => "ERR_QUOTE_UNAVAILABLE",
            TradeError::Conflict { .. } => "ERR_CONFLICT",
            TradeError::AccountNotFound(_) => "ERR_ACCOUNT_NOT_FOUND",
            TradeError::Storage(_) => "ERR_STORAGE",
        }
    }

    /// Business rejections, as opposed to infrastructure failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TradeError::InvalidInput { .. }
                | TradeError::InsufficientFunds { .. }
                | TradeError::InsufficientHoldings { .. }
        )
    }
}

/// Reasons a registration is refused.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistrationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {min_length} characters")]
    WeakPassword { min_length: usize },

    #[error("An account with email {0} already exists")]
    DuplicateEmail(String),
}
