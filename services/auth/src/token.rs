//! Session token codec
//!
//! Tokens are compact HS256 JWTs binding a subject (the identity's phone
//! number) to an issued-at and an expiry timestamp. The signing secret is
//! loaded once at startup and never changes for the lifetime of the process.
//! Validity depends only on the signature and the clock; there is no
//! server-side session table.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, AuthResult, TokenError};

/// Smallest accepted signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Default token lifetime in seconds (one day)
const DEFAULT_TOKEN_EXPIRY: u64 = 86_400;

/// Token configuration
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC secret used to sign and verify tokens
    pub secret: String,
    /// Token lifetime in seconds
    pub token_expiry: u64,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("token_expiry", &self.token_expiry)
            .finish()
    }
}

impl TokenConfig {
    /// Create a new TokenConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: HMAC signing secret (at least 32 bytes)
    /// - `JWT_SECRET_FILE`: Path to a file holding the secret, used when `JWT_SECRET` is unset
    /// - `JWT_TOKEN_EXPIRY`: Token lifetime in seconds (default: 86400)
    pub fn from_env() -> Result<Self> {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                let path = std::env::var("JWT_SECRET_FILE").map_err(|_| {
                    anyhow::anyhow!("JWT_SECRET or JWT_SECRET_FILE environment variable not set")
                })?;
                std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to read secret file {}: {}", path, e))?
                    .trim()
                    .to_string()
            }
        };

        let token_expiry = match std::env::var("JWT_TOKEN_EXPIRY") {
            Ok(value) => value
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid JWT_TOKEN_EXPIRY {:?}: {}", value, e))?,
            Err(_) => DEFAULT_TOKEN_EXPIRY,
        };

        Ok(TokenConfig {
            secret,
            token_expiry,
        })
    }
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject key (phone number)
    pub sub: String,
    /// Issued at, seconds since the Unix epoch
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch
    pub exp: i64,
}

impl Claims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    /// Initialize a new token codec
    pub fn new(config: &TokenConfig) -> Result<Self> {
        if config.secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("Token signing secret must be at least {MIN_SECRET_LEN} bytes long");
        }
        if config.token_expiry == 0 {
            anyhow::bail!("Token expiry must be greater than zero");
        }
        let ttl = i64::try_from(config.token_expiry)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| anyhow::anyhow!("Token expiry is too large"))?;

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Expiry is judged against the caller's clock after the signature
        // check, so the library's own clock and leeway are disabled.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(TokenCodec {
            encoding_key,
            decoding_key,
            validation,
            ttl,
        })
    }

    /// Token lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        self.ttl.num_seconds().unsigned_abs()
    }

    /// Issue a token for `subject` valid from `now` until `now + ttl`
    pub fn issue(&self, subject: &str, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Decode a token as seen at `now`.
    ///
    /// The signature is verified first; a token is expired once `now`
    /// reaches its expiry.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                debug!("Token rejected: {}", e);
                match e.kind() {
                    ErrorKind::InvalidSignature => TokenError::BadSignature,
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Malformed,
                }
            })?;

        let claims = token_data.claims;
        if claims.exp < claims.iat {
            return Err(TokenError::Malformed);
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
