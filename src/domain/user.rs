//! User entity and password hashing

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::game::check_length;
use super::{DomainError, Role};

const SALT_BYTES: usize = 16;
const MIN_PASSWORD_LEN: usize = 8;

/// Longest address the `users.email` column holds
pub const EMAIL_MAX: usize = 254;

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a user from registration input, hashing the password.
    ///
    /// # Errors
    /// `DomainError::Validation` when the name is outside 2..=100 characters,
    /// the email is malformed or longer than 254 characters, or the password
    /// is shorter than 8 characters.
    pub fn register(
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = name.trim();
        check_length("name", name, 2, 100)?;

        let email = email.trim().to_lowercase();
        if email.chars().count() > EMAIL_MAX {
            return Err(DomainError::validation(format!(
                "Email address cannot exceed {EMAIL_MAX} characters"
            )));
        }
        if !is_plausible_email(&email) {
            return Err(DomainError::validation(format!("Invalid email address: {email}")));
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "Password must have at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            role,
            password_hash: hash_password(password),
            created_at: now,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Hash a password as `salt$sha256(salt || password)`, both hex encoded.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    let hash = salt_and_hash(&salt, password);
    format!("{salt}${hash}")
}

fn salt_and_hash(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
