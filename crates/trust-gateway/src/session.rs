//! Wallet session tokens.
//!
//! Sessions are HS256 JWTs whose subject is the wallet address.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use trust_token::WalletAddress;

use crate::config::SessionSection;
use crate::error::{GatewayError, GatewayResult};

/// Session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Wallet address.
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Token ID.
    pub jti: String,
}

/// Issues and validates session tokens.
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl SessionIssuer {
    /// Create an issuer from the session config section.
    #[must_use]
    pub fn new(config: &SessionSection) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            lifetime: Duration::days(i64::from(config.lifetime_days)),
        }
    }

    /// Issue a token for `wallet`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if encoding fails.
    pub fn issue(&self, wallet: &WalletAddress) -> GatewayResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: wallet.as_str().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| GatewayError::internal(format!("failed to sign session: {e}")))
    }

    /// Validate `token` and return its wallet.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Authentication`] for an expired, tampered or
    /// malformed token.
    pub fn verify(&self, token: &str) -> GatewayResult<WalletAddress> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => GatewayError::authentication("session expired"),
                _ => GatewayError::authentication(format!("invalid session: {e}")),
            }
        })?;
        WalletAddress::parse(&data.claims.sub)
            .map_err(|e| GatewayError::authentication(format!("invalid session subject: {e}")))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns [`GatewayError::Authentication`] for any other format.
pub fn bearer_token(header: &str) -> GatewayResult<&str> {
    header
        .trim()
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| GatewayError::authentication("expected 'Bearer <token>' authorization"))
}
