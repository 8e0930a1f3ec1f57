use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::{json, Value};

use super::responses::{trade_status, ApiError};
use crate::application::state::AppState;
use crate::auth::CurrentUser;
use crate::domain::entities::transaction::TradeSide;
use crate::domain::services::trade_settlement::TradeParams;

/// Order form for `/trade`, `/buy` and `/sell`
pub async fn trade_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let stock_list = state.market.stock_list().await?;
    Ok(Json(json!({
        "page_title": "Trade",
        "balance": user.account.balance,
        "stock_list": stock_list,
    })))
}

pub async fn buy(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(params): Form<TradeParams>,
) -> Result<Response, ApiError> {
    submit(state, user, TradeSide::Buy, params).await
}

pub async fn sell(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(params): Form<TradeParams>,
) -> Result<Response, ApiError> {
    submit(state, user, TradeSide::Sell, params).await
}

/// Settle the order and re-render the trade page with the outcome inline.
/// The page data is loaded first so a settled order is always reported.
async fn submit(
    state: AppState,
    user: CurrentUser,
    side: TradeSide,
    params: TradeParams,
) -> Result<Response, ApiError> {
    let stock_list = state.market.stock_list().await?;

    let account_id = &user.account.id;
    let result = match side {
        TradeSide::Buy => state.trading.buy(account_id, &params).await,
        TradeSide::Sell => state.trading.sell(account_id, &params).await,
    };

    let response = match result {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "stock_list": stock_list,
                "success": outcome.message(),
                "transaction": outcome,
            })),
        ),
        Err(e) => (
            trade_status(&e),
            Json(json!({
                "stock_list": stock_list,
                "error": e.user_message(),
            })),
        ),
    };
    Ok(response.into_response())
}

pub async fn portfolio(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Value>, ApiError> {
    let portfolio = state.trading.portfolio(&user.account.id).await?;
    Ok(Json(json!({
        "page_title": "Portfolio",
        "user": user.account,
        "portfolio": portfolio,
    })))
}
