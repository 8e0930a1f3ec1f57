//! Account entity and registration input

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::errors::RegistrationError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A registered user with a simulated cash balance.
///
/// `version` increases on every balance change and is what settlement
/// compares against to detect concurrent writers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: Decimal,
    #[serde(skip)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// Raw registration form. Every field is optional so that a missing one
/// is reported as a validation error rather than a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration that passed validation; the password is still plain text
/// and must be hashed before it is stored.
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(self) -> Result<Registration, RegistrationError> {
        let first_name = required(self.firstname, "firstname")?;
        let last_name = required(self.lastname, "lastname")?;
        let email = required(self.email, "email")?.to_ascii_lowercase();
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or(RegistrationError::MissingField("password"))?;

        if !is_plausible_email(&email) {
            return Err(RegistrationError::InvalidEmail(email));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(RegistrationError::WeakPassword {
                min_length: MIN_PASSWORD_LENGTH,
            });
        }

        Ok(Registration {
            first_name,
            last_name,
            email,
            password,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RegistrationError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(RegistrationError::MissingField(field))
}

/// `local@domain.tld` with no whitespace. Deliverability is not checked.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}
