//! Stateless session tokens.
//!
//! HS256-signed JWTs carrying the account id and an expiry. Tokens are never
//! stored server-side; revocation before natural expiry happens only through
//! secret rotation or the per-request account re-check in the auth middleware.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Account id.
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens with a process-wide secret.
///
/// Constructed explicitly from config at startup so tests can run isolated
/// issuers with distinct secrets.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &str, expiry_days: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; no clock-skew grace on a single-host deployment.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expiry: Duration::days(expiry_days),
        }
    }

    pub fn issue(&self, account_id: i32) -> Result<String, TokenError> {
        self.issue_with_ttl(account_id, self.expiry)
    }

    pub fn issue_with_ttl(&self, account_id: i32, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Fails closed: malformed input, a bad signature, or an elapsed expiry
    /// all yield `None`, never a partial identity.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<i32> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).ok()?;
        data.claims.sub.parse().ok()
    }

    /// Session lifetime in whole seconds, for the cookie's Max-Age.
    #[must_use]
    pub fn expiry_seconds(&self) -> i64 {
        self.expiry.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-test-secret-test-secret!", 7)
    }

    #[test]
    fn test_round_trip() {
        let issuer = issuer();
        let token = issuer.issue(42).unwrap();
        assert_eq!(issuer.verify(&token), Some(42));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = issuer();
        let token = issuer.issue_with_ttl(42, Duration::minutes(-2)).unwrap();
        assert_eq!(issuer.verify(&token), None);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = issuer();
        let token = issuer.issue(42).unwrap();

        // Flip one character in each segment; every mutation must fail closed.
        let bytes = token.as_bytes();
        for position in [5, token.len() / 2, token.len() - 2] {
            let mut mutated = bytes.to_vec();
            mutated[position] = if mutated[position] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(mutated).unwrap();
            if mutated == token {
                continue;
            }
            assert_eq!(issuer.verify(&mutated), None, "position {position}");
        }
    }

    #[test]
    fn test_garbage_rejected() {
        let issuer = issuer();
        assert_eq!(issuer.verify(""), None);
        assert_eq!(issuer.verify("null"), None);
        assert_eq!(issuer.verify("not.a.token"), None);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issuer().issue(42).unwrap();
        let other = TokenIssuer::new("another-secret-another-secret-anoth", 7);
        assert_eq!(other.verify(&token), None);
    }
}
