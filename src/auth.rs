//! Authentication primitives
//!
//! Password hashing, signed session tokens, and the middleware that guards
//! routes requiring a logged-in user.
//!
//! Passwords are stored as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`
//! (PBKDF2 with HMAC-SHA256, 16-byte random salt). Session tokens are HS256
//! JWTs naming the account (`sub`) and the server-side session row (`sid`),
//! so a session can be revoked before the token expires.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::application::handlers::responses::ApiError;
use crate::application::state::AppState;
use crate::domain::entities::account::UserAccount;
use crate::domain::errors::RegistrationError;
use crate::persistence::DatabaseError;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Session expired or logged out")]
    SessionEnded,

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<DatabaseError> for AuthError {
    fn from(e: DatabaseError) -> Self {
        AuthError::Storage(e.to_string())
    }
}

fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive_key(password.as_bytes(), &salt, iterations);
    format!(
        "{}${}${}${}",
        HASH_SCHEME,
        iterations,
        hex::encode(salt),
        hex::encode(hash)
    )
}

/// Check `password` against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iterations, salt, expected] = parts.as_slice() else {
        warn!("Stored password hash has an unexpected format");
        return false;
    };
    if *scheme != HASH_SCHEME {
        warn!("Unsupported password hash scheme: {}", scheme);
        return false;
    }
    let (Ok(iterations), Ok(salt), Ok(expected)) = (
        iterations.parse::<u32>(),
        hex::decode(salt),
        hex::decode(expected),
    ) else {
        warn!("Stored password hash could not be decoded");
        return false;
    };

    let actual = derive_key(password.as_bytes(), &salt, iterations.max(1));
    constant_time_eq(&actual, &expected)
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id
    pub sub: String,
    /// Session id
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies session tokens
pub struct SessionSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionSigner {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn issue(&self, account_id: &str, session_id: &str, expires_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: account_id.to_string(),
            sid: session_id.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(format!("Failed to encode JWT: {}", e)))
    }

    /// Checks signature and expiry only; revocation is checked against storage
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

/// Where a request's session token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cookie,
    Bearer,
}

/// Session token from `Authorization: Bearer` or the session cookie, header first
pub fn session_token(headers: &HeaderMap) -> Option<(TokenSource, String)> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some((TokenSource::Bearer, token.to_string()));
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| (TokenSource::Cookie, value.to_string()))
}

/// `Set-Cookie` value for a new session
pub fn session_cookie(token: &str, max_age: chrono::Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        max_age.num_seconds().max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Only same-site absolute paths are accepted as post-login targets
pub fn safe_redirect_target(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

/// The logged-in user, placed in request extensions by [`require_session`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub account: UserAccount,
    pub session_id: String,
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

fn login_redirect(path: &str) -> Response {
    let location = format!("/login?next={}", path.replace('&', "%26"));
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to(&location),
    )
        .into_response()
}

/// Middleware to require a logged-in user for protected pages.
///
/// Browsers without a valid session are redirected to the login page; API
/// clients that sent a bearer token get a 401 instead.
pub async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some((source, token)) = session_token(request.headers()) else {
        debug!("No session on {}", request.uri().path());
        return login_redirect(request.uri().path());
    };

    match state.auth.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(AuthError::Storage(e)) => ApiError::from(AuthError::Storage(e)).into_response(),
        Err(e) => {
            debug!("Rejected session on {}: {}", request.uri().path(), e);
            match source {
                TokenSource::Bearer => ApiError::from(e).into_response(),
                TokenSource::Cookie => login_redirect(request.uri().path()),
            }
        }
    }
}
