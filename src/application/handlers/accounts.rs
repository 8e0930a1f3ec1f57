use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::responses::ApiError;
use crate::application::state::AppState;
use crate::auth::{clear_session_cookie, safe_redirect_target, session_cookie, session_token};
use crate::domain::entities::account::RegistrationForm;

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Page to return to, also accepted as a query parameter
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

pub async fn register_page() -> Json<Value> {
    Json(json!({ "page_title": "Register" }))
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> Result<Redirect, ApiError> {
    state.auth.register(form).await?;
    Ok(Redirect::to("/"))
}

pub async fn login_page(Query(query): Query<NextQuery>) -> Json<Value> {
    Json(json!({
        "page_title": "Login",
        "next": safe_redirect_target(query.next.as_deref()),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let session = state
        .auth
        .login(form.username.as_deref(), form.password.as_deref())
        .await?;

    let next = form.next.as_deref().or(query.next.as_deref());
    let cookie = session_cookie(&session.token, state.auth.session_ttl(), state.secure_cookies);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to(safe_redirect_target(next)),
    )
        .into_response())
}

/// Revoke the current session, if any, and clear the cookie
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some((_, token)) = session_token(&headers) {
        if let Err(e) = state.auth.logout(&token).await {
            error!("Failed to revoke session on logout: {}", e);
        }
    }
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}
