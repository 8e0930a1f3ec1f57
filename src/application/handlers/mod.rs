pub mod accounts;
pub mod pages;
pub mod responses;
pub mod trading;

use axum::{middleware, routing::get, Router};

use crate::application::state::AppState;
use crate::auth::require_session;
use crate::rate_limit::limit_form_posts;

/// All routes, without transport layers (tracing, body limits)
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/trade", get(trading::trade_page))
        .route("/buy", get(trading::trade_page).post(trading::buy))
        .route("/sell", get(trading::trade_page).post(trading::sell))
        .route("/portfolio", get(trading::portfolio))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    let account_forms = Router::new()
        .route("/register", get(accounts::register_page).post(accounts::register))
        .route("/login", get(accounts::login_page).post(accounts::login))
        .route_layer(middleware::from_fn_with_state(
            state.auth_limiter.clone(),
            limit_form_posts,
        ));

    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(pages::health_check))
        .route("/compare", get(pages::compare))
        .route("/stock/:symbol", get(pages::stock_page))
        .route("/stock/:symbol/historic", get(pages::historic))
        .route("/logout", get(accounts::logout))
        .merge(protected)
        .merge(account_forms)
        .with_state(state)
}
