use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::application::services::market_service::MarketError;
use crate::auth::AuthError;
use crate::domain::errors::TradeError;

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by handlers, rendered as `{"error": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(cause: impl std::fmt::Display) -> Self {
        error!("Request failed: {}", cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

/// HTTP status for a refused or failed trade
pub fn trade_status(e: &TradeError) -> StatusCode {
    match e {
        TradeError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        TradeError::InsufficientFunds { .. } | TradeError::InsufficientHoldings { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        TradeError::QuoteUnavailable { .. } => StatusCode::BAD_GATEWAY,
        TradeError::Conflict { .. } => StatusCode::CONFLICT,
        TradeError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        TradeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<TradeError> for ApiError {
    fn from(e: TradeError) -> Self {
        if let TradeError::Storage(cause) = &e {
            error!("Trade storage failure: {}", cause);
        }
        ApiError::new(trade_status(&e), e.user_message())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingField(field) => ApiError::new(StatusCode::BAD_REQUEST, format!("Missing {}", field)),
            AuthError::InvalidCredentials => ApiError::new(StatusCode::UNAUTHORIZED, e.to_string()),
            AuthError::InvalidToken(_) | AuthError::SessionEnded => {
                ApiError::new(StatusCode::UNAUTHORIZED, "Not logged in")
            }
            AuthError::Registration(e) => ApiError::new(StatusCode::BAD_REQUEST, e.to_string()),
            AuthError::Hashing(_) | AuthError::Storage(_) => ApiError::internal(e),
        }
    }
}

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        match e {
            MarketError::UnknownSymbol(_) => ApiError::new(StatusCode::NOT_FOUND, e.to_string()),
            MarketError::Provider(ref cause) => {
                tracing::warn!("Market data unavailable: {}", cause);
                ApiError::new(StatusCode::BAD_GATEWAY, "Market data is temporarily unavailable")
            }
            MarketError::Database(_) => ApiError::internal(e),
        }
    }
}
