// Router-level tests: requests go through the full middleware stack

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::application::handlers::build_router;
use crate::application::state::AppState;
use crate::config::AppConfig;
use crate::infrastructure::sample_provider::SampleStockProvider;
use crate::persistence::{init_database, DatabaseConfig, DbPool};

const PASSWORD: &str = "rails7777";

struct TestApp {
    router: Router,
    state: AppState,
    provider: Arc<SampleStockProvider>,
    pool: DbPool,
}

async fn test_app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
    let mut config = AppConfig::with_secret("0123456789abcdef0123456789abcdef");
    config.password_iterations = 10;
    config.starting_balance = Decimal::from(1000);
    configure(&mut config);

    let provider = Arc::new(SampleStockProvider::with_quotes(&[("AAPL", "150"), ("MSFT", "300")]));
    let state = AppState::new(pool.clone(), provider.clone(), &config);
    TestApp {
        router: build_router(state.clone()),
        state,
        provider,
        pool,
    }
}

async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

impl TestApp {
    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Register and log in a user, returning the `session=...` cookie pair
    async fn logged_in(&self, email: &str) -> String {
        let body = format!(
            "firstname=Alaa&lastname=Yahia&email={}&password={}",
            email, PASSWORD
        );
        let response = self.post_form("/register", &body, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = self
            .post_form("/login", &format!("username={}&password={}", email, PASSWORD), None)
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_pair(&response)
    }
}

fn session_pair(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn location(response: &Response) -> &str {
    response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_homepage_lists_ranked_stocks() {
    let app = test_app().await;

    let body = body_json(app.get("/", None).await).await;
    assert_eq!(body["page_title"], "Main");
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    app.state.market.refresh_top_ranks().await.unwrap();
    let body = body_json(app.get("/", None).await).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["symbol"], "AAPL");
    assert_eq!(data[0]["top_rank"], 1);
    assert_eq!(data[1]["symbol"], "MSFT");
}

#[tokio::test]
async fn test_stock_page() {
    let app = test_app().await;

    let response = app.get("/stock/aapl", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["page_title"], "Stock Page - AAPL");
    assert_eq!(body["data"]["symbol"], "AAPL");

    assert_eq!(app.get("/stock/ZZZZ", None).await.status(), StatusCode::NOT_FOUND);

    app.provider.set_unavailable(true);
    assert_eq!(app.get("/stock/MSFT", None).await.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_historic_prices() {
    let app = test_app().await;
    let response = app.get("/stock/AAPL/historic", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 21);
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login() {
    let app = test_app().await;
    for path in ["/trade", "/buy", "/sell", "/portfolio"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), format!("/login?next={}", path));
    }

    let response = app.post_form("/buy", "symbol=AAPL&quantity=1", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_bad_bearer_token_is_unauthorized() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/trade")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_rules() {
    let app = test_app().await;
    let form = "firstname=Alaa&lastname=Yahia&email=alaa%40example.com&password=rails7777";

    let response = app.post_form("/register", form, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app.post_form("/register", form, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let weak = "firstname=A&lastname=B&email=b%40example.com&password=short";
    assert_eq!(app.post_form("/register", weak, None).await.status(), StatusCode::BAD_REQUEST);

    let missing = "firstname=A&email=c%40example.com&password=rails7777";
    assert_eq!(app.post_form("/register", missing, None).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_outcomes() {
    let app = test_app().await;
    app.logged_in("alaa%40example.com").await;

    let response = app
        .post_form("/login", "username=alaa%40example.com&password=wrong-password", None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.post_form("/login", "username=alaa%40example.com", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_form(
            "/login?next=/portfolio",
            "username=alaa%40example.com&password=rails7777",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/portfolio");
    let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_trade_pages_through_http() {
    let app = test_app().await;
    app.state.market.refresh_top_ranks().await.unwrap();
    let cookie = app.logged_in("alaa%40example.com").await;

    let response = app.get("/trade", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stock_list"].as_array().unwrap().len(), 2);

    let response = app.post_form("/buy", "symbol=AAPL&quantity=5", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["success"],
        "You have bought 5 AAPL for a price 750.00\n your current balance is: 250.00"
    );
    assert_eq!(body["stock_list"].as_array().unwrap().len(), 2);

    let response = app.post_form("/buy", "symbol=AAPL&quantity=5", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "not enough balance");

    app.provider.set_price("AAPL", Decimal::from(160));
    let response = app.post_form("/sell", "symbol=AAPL&quantity=3", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["success"],
        "You have sold 3 AAPL for a price 480.00\n your current balance is: 730.00"
    );

    let response = app.post_form("/sell", "symbol=AAPL&quantity=3", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["error"], "Not enough stocks to sell");

    let response = app.post_form("/buy", "symbol=AAPL&quantity=abc", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid input");
    assert!(body["stock_list"].is_array());

    let response = app.post_form("/buy", "symbol=ZZZZ&quantity=1", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = app.get("/portfolio", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["portfolio"]["holdings"][0]["quantity"], 2);
    assert_eq!(body["portfolio"]["transactions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_trade_page_failure_settles_nothing() {
    let app = test_app().await;
    let cookie = app.logged_in("alaa%40example.com").await;
    sqlx::query("DROP TABLE stocks").execute(&app.pool).await.unwrap();

    let response = app.post_form("/buy", "symbol=AAPL&quantity=1", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(app.get("/portfolio", Some(&cookie)).await).await;
    assert_eq!(body["portfolio"]["transactions"].as_array().unwrap().len(), 0);
    assert!(body["portfolio"]["holdings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_logout_revokes_the_session() {
    let app = test_app().await;
    let cookie = app.logged_in("alaa%40example.com").await;
    assert_eq!(app.get("/portfolio", Some(&cookie)).await.status(), StatusCode::OK);

    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(session_pair(&response).ends_with("session="));

    let response = app.get("/portfolio", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_attempts_are_rate_limited() {
    let app = test_app_with(|config| config.auth_rate_limit_per_minute = 2).await;
    let attempt = "username=nobody%40example.com&password=whatever1";

    assert_eq!(app.post_form("/login", attempt, None).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.post_form("/login", attempt, None).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.post_form("/login", attempt, None).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(app.get("/login", None).await.status(), StatusCode::OK);
}
