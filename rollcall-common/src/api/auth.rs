//! Account credentials and bearer tokens
//!
//! # Passwords
//!
//! Stored as Argon2id PHC strings; the salt travels inside the string.
//!
//! # Tokens
//!
//! `<role>.<account id>.<expires ms>.<sha256 hex>` where the digest covers the
//! first three fields followed by the shared secret. The secret is a random
//! non-zero i64 kept in the `settings` table and created on first start.
//!
//! Pure functions plus settings-table access only; HTTP extraction lives in
//! the server crate.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::fmt;
use subtle::ConstantTimeEq;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::{Error, Result};

/// Settings key holding the token-signing secret
pub const SECRET_SETTING_KEY: &str = "token_signing_secret";

pub const MIN_PASSWORD_LEN: usize = 6;

const MS_PER_HOUR: i64 = 60 * 60 * 1000;

// ========================================
// Passwords
// ========================================

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`] characters
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// False for a wrong password or an unparseable stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// ========================================
// Tokens
// ========================================

/// Account type a token was issued to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            other => Err(Error::Auth(format!("Unknown role '{}'", other))),
        }
    }
}

/// Verified token contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    pub role: Role,
    pub account_id: Uuid,
    pub expires_at_ms: i64,
}

/// SHA-256 over `payload` with the secret appended, lowercase hex
pub fn calculate_hash(payload: &str, secret: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(secret.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn issue_token(role: Role, account_id: Uuid, secret: i64, now_ms: i64, ttl_hours: u32) -> String {
    let expires_at_ms = now_ms + i64::from(ttl_hours) * MS_PER_HOUR;
    let payload = format!("{}.{}.{}", role, account_id, expires_at_ms);
    let signature = calculate_hash(&payload, secret);
    format!("{}.{}", payload, signature)
}

/// Constant-time comparison of the expected and presented signatures
fn signature_matches(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

/// Check signature and expiry
pub fn verify_token(token: &str, secret: i64, now_ms: i64) -> Result<TokenClaims> {
    let invalid = || Error::Auth("Invalid token".to_string());

    let mut parts = token.trim().splitn(4, '.');
    let (role, id, expires, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(r), Some(i), Some(e), Some(s)) => (r, i, e, s),
        _ => return Err(invalid()),
    };

    let payload = format!("{}.{}.{}", role, id, expires);
    if !signature_matches(&calculate_hash(&payload, secret), signature) {
        return Err(invalid());
    }

    let role: Role = role.parse().map_err(|_| invalid())?;
    let account_id = Uuid::parse_str(id).map_err(|_| invalid())?;
    let expires_at_ms: i64 = expires.parse().map_err(|_| invalid())?;

    if now_ms >= expires_at_ms {
        return Err(Error::Auth("Token expired".to_string()));
    }

    Ok(TokenClaims {
        role,
        account_id,
        expires_at_ms,
    })
}

// ========================================
// Shared Secret Management
// ========================================

/// Load the signing secret, creating it on first use
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64> {
    let result: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SECRET_SETTING_KEY)
        .fetch_optional(db)
        .await?;

    match result {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| Error::Config(format!("Invalid {} setting: {}", SECRET_SETTING_KEY, e))),
        None => initialize_shared_secret(db).await,
    }
}

/// Store a fresh random non-zero secret unless one already exists
///
/// Returns whichever secret ends up stored, so concurrent first starts agree.
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64> {
    let candidate = random_secret();

    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(SECRET_SETTING_KEY)
        .bind(candidate.to_string())
        .execute(db)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Generated new token signing secret");
        return Ok(candidate);
    }

    let (value,): (String,) = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SECRET_SETTING_KEY)
        .fetch_one(db)
        .await?;
    value
        .parse::<i64>()
        .map_err(|e| Error::Config(format!("Invalid {} setting: {}", SECRET_SETTING_KEY, e)))
}

fn random_secret() -> i64 {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            return val;
        }
    }
}
