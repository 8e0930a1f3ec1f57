use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use super::responses::ApiError;
use crate::application::state::AppState;

/// Homepage: the most active stocks, best rank first
pub async fn index(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let top = state.market.top_stocks().await?;
    Ok(Json(json!({
        "page_title": "Main",
        "data": top,
    })))
}

/// Current quote for one symbol
pub async fn stock_page(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let quote = state.market.quote(&symbol).await?;
    Ok(Json(json!({
        "page_title": format!("Stock Page - {}", quote.symbol),
        "data": quote,
    })))
}

/// One month of daily prices for charting
pub async fn historic(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let snapshots = state.market.historic(&symbol).await?;
    Ok(Json(json!({ "data": snapshots })))
}

/// Symbol picker for side-by-side charts
pub async fn compare(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stock_list = state.market.stock_list().await?;
    Ok(Json(json!({
        "page_title": "Compare",
        "stock_list": stock_list,
    })))
}

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
