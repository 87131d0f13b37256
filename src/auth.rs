use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task;
use tracing::warn;

use crate::config::AuthConfig;
use crate::db::User;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Minimal public account fields embedded in the session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
}

/// Signed session claims. Stateless: nothing is persisted server-side, a
/// request is authenticated by verifying the signature and expiry, then
/// re-resolving the account by username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the session belongs to.
    pub sub: String,
    pub user: SessionUser,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn new(user: &User, expiry: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.username.clone(),
            user: SessionUser {
                id: user.id,
                username: user.username.clone(),
            },
            iat: now.timestamp(),
            exp: (now + expiry).timestamp(),
        }
    }
}

/// Issues and verifies signed session tokens, and owns password hashing.
pub struct Authenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
    cookie_name: String,
    secure_cookies: bool,
}

impl Authenticator {
    pub fn new(config: &AuthConfig, secure_cookies: bool) -> Self {
        let key = if config.signing_key.is_empty() {
            warn!("No SIGNING_KEY configured; using a random key (sessions will not survive restarts)");
            generate_signing_key()
        } else {
            config.signing_key.clone()
        };

        Self {
            encoding_key: EncodingKey::from_secret(key.as_bytes()),
            decoding_key: DecodingKey::from_secret(key.as_bytes()),
            expiry: Duration::hours(config.token_expiry_hours),
            cookie_name: config.cookie_name.clone(),
            secure_cookies,
        }
    }

    /// Issue a signed token for a freshly authenticated account.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let claims = Claims::new(user, self.expiry);
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Set-Cookie value carrying the session token.
    #[must_use]
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            self.cookie_name,
            token,
            self.expiry.num_seconds(),
            if self.secure_cookies { "; Secure" } else { "" },
        )
    }

    /// Set-Cookie value that expires the session cookie immediately.
    #[must_use]
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            self.cookie_name,
            if self.secure_cookies { "; Secure" } else { "" },
        )
    }
}

/// Hash a password with Argon2id.
/// Runs under `spawn_blocking` because Argon2 is CPU-intensive and would
/// stall the async runtime if run inline.
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let password = password.to_string();
    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hash(format!("hashing task panicked: {e}")))?
}

/// Verify a password against a stored Argon2 hash.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHash, PasswordVerifier},
    };

    let password = password.to_string();
    let password_hash = password_hash.to_string();
    task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)
            .map_err(|e| AuthError::Hash(format!("invalid password hash format: {e}")))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AuthError::Hash(format!("verification task panicked: {e}")))?
}

/// Random fallback signing key (64 character hex string).
fn generate_signing_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
