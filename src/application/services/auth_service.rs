//! Registration, login and session lookup

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::auth::{hash_password, verify_password, AuthError, CurrentUser, SessionSigner};
use crate::config::AppConfig;
use crate::domain::entities::account::{RegistrationForm, UserAccount};
use crate::domain::errors::RegistrationError;
use crate::persistence::models::CreateAccount;
use crate::persistence::repository::{AccountRepository, SessionRepository};
use crate::persistence::{DatabaseError, DbPool};

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub account: UserAccount,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthService {
    accounts: AccountRepository,
    sessions: SessionRepository,
    signer: SessionSigner,
    session_ttl: chrono::Duration,
    starting_balance: Decimal,
    password_iterations: u32,
    /// Verified against when the email is unknown, so both failure paths cost the same
    dummy_hash: String,
}

impl AuthService {
    pub fn new(pool: DbPool, config: &AppConfig) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool),
            signer: SessionSigner::new(config.session_secret.as_bytes()),
            session_ttl: config.session_ttl,
            starting_balance: config.starting_balance,
            password_iterations: config.password_iterations,
            dummy_hash: hash_password("not-a-real-password", config.password_iterations),
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        self.session_ttl
    }

    /// Validate the form and create an account credited with the starting balance
    pub async fn register(&self, form: RegistrationForm) -> Result<UserAccount, AuthError> {
        let registration = form.validate()?;

        let iterations = self.password_iterations;
        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, iterations))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let account = self
            .accounts
            .create(CreateAccount {
                email: registration.email,
                first_name: registration.first_name,
                last_name: registration.last_name,
                password_hash,
                balance: self.starting_balance,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation(email) => {
                    AuthError::Registration(RegistrationError::DuplicateEmail(email))
                }
                other => AuthError::from(other),
            })?;

        info!("Registered account {} ({})", account.id, account.email);
        Ok(account)
    }

    /// Check credentials and open a new session
    pub async fn login(&self, username: Option<&str>, password: Option<&str>) -> Result<LoginSession, AuthError> {
        let email = username
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(AuthError::MissingField("username"))?
            .to_ascii_lowercase();
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MissingField("password"))?
            .to_string();

        let record = self.accounts.find_by_email(&email).await?;
        let stored_hash = record
            .as_ref()
            .map(|r| r.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());

        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let record = match record {
            Some(record) if matches => record,
            _ => {
                warn!("Failed login attempt for {}", email);
                return Err(AuthError::InvalidCredentials);
            }
        };
        let account = UserAccount::try_from(record)?;

        let expires_at = Utc::now() + self.session_ttl;
        let session = self.sessions.create(&account.id, expires_at).await?;
        let token = self.signer.issue(&account.id, &session.id, expires_at)?;

        info!("Account {} logged in", account.id);
        Ok(LoginSession {
            account,
            token,
            expires_at,
        })
    }

    /// Resolve a session token to the logged-in user
    pub async fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self.signer.verify(token)?;

        let session = self
            .sessions
            .get(&claims.sid)
            .await?
            .filter(|s| s.account_id == claims.sub && s.is_active(Utc::now()))
            .ok_or(AuthError::SessionEnded)?;

        let account = self
            .accounts
            .get(&session.account_id)
            .await?
            .ok_or(AuthError::SessionEnded)?;

        Ok(CurrentUser {
            account,
            session_id: session.id,
        })
    }

    /// Revoke the session behind `token`. Unknown or invalid tokens are a no-op.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        let claims = match self.signer.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Logout with unusable token: {}", e);
                return Ok(false);
            }
        };
        let revoked = self.sessions.revoke(&claims.sid).await?;
        if revoked {
            info!("Account {} logged out", claims.sub);
        }
        Ok(revoked)
    }

    /// Drop sessions that are expired or revoked
    pub async fn purge_sessions(&self) -> Result<u64, AuthError> {
        let purged = self.sessions.purge_expired(Utc::now()).await?;
        if purged > 0 {
            info!("Purged {} stale sessions", purged);
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{init_database, DatabaseConfig};

    async fn service() -> AuthService {
        let pool = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        let mut config = AppConfig::with_secret("0123456789abcdef0123456789abcdef");
        config.password_iterations = 10;
        config.starting_balance = Decimal::from(1000);
        AuthService::new(pool, &config)
    }

    fn form(email: &str, password: &str) -> RegistrationForm {
        RegistrationForm {
            firstname: Some("Ada".to_string()),
            lastname: Some("Lovelace".to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_credits_starting_balance() {
        let auth = service().await;
        let account = auth.register(form("Ada@Example.com", "analytical")).await.unwrap();
        assert_eq!(account.email, "ada@example.com");
        assert_eq!(account.balance, Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let auth = service().await;
        auth.register(form("ada@example.com", "analytical")).await.unwrap();
        let err = auth
            .register(form("ADA@example.com", "different1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Registration(RegistrationError::DuplicateEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_weak_password_is_rejected() {
        let auth = service().await;
        let err = auth.register(form("ada@example.com", "short")).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Registration(RegistrationError::WeakPassword { .. })
        ));
    }

    #[tokio::test]
    async fn test_login_authenticate_logout() {
        let auth = service().await;
        let account = auth.register(form("ada@example.com", "analytical")).await.unwrap();

        let session = auth.login(Some(" ADA@example.com "), Some("analytical")).await.unwrap();
        assert_eq!(session.account.id, account.id);

        let user = auth.authenticate(&session.token).await.unwrap();
        assert_eq!(user.account.id, account.id);

        assert!(auth.logout(&session.token).await.unwrap());
        assert!(matches!(
            auth.authenticate(&session.token).await,
            Err(AuthError::SessionEnded)
        ));
        assert!(!auth.logout(&session.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let auth = service().await;
        auth.register(form("ada@example.com", "analytical")).await.unwrap();

        assert!(matches!(
            auth.login(Some("ada@example.com"), Some("wrong-password")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(Some("nobody@example.com"), Some("analytical")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(None, Some("analytical")).await,
            Err(AuthError::MissingField("username"))
        ));
        assert!(matches!(
            auth.login(Some("ada@example.com"), Some("")).await,
            Err(AuthError::MissingField("password"))
        ));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let auth = service().await;
        assert!(matches!(
            auth.authenticate("garbage").await,
            Err(AuthError::InvalidToken(_))
        ));
        assert!(!auth.logout("garbage").await.unwrap());
    }
}
