use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::JwtConfig;

/// Signed payload carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token lifetime overflows the calendar")]
    ExpiryOutOfRange,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// HS256 issuer/verifier bound to the configured secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl: config.expires_in,
        }
    }

    pub fn issue(&self, user_id: i64, email: &str) -> Result<String, TokenError> {
        self.issue_with_ttl(user_id, email, self.ttl)
    }

    pub fn issue_with_ttl(&self, user_id: i64, email: &str, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = Claims {
            user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        // jsonwebtoken still accepts `exp == now`; a token is only valid strictly before expiry
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: secret.to_string(),
            expires_in: Duration::hours(1),
        })
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service("secret");
        let token = tokens.issue(42, "a@x.com").unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn flipped_signature_is_rejected() {
        let tokens = service("secret");
        let token = tokens.issue(1, "a@x.com").unwrap();

        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(tokens.verify(&tampered), Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let tokens = service("secret");
        let forged = service("other").issue(1, "a@x.com").unwrap();

        assert!(matches!(tokens.verify(&forged), Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service("secret");
        let token = tokens.issue_with_ttl(1, "a@x.com", Duration::seconds(-5)).unwrap();

        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn token_is_dead_at_its_expiry_second() {
        let tokens = service("secret");
        let token = tokens.issue_with_ttl(1, "a@x.com", Duration::zero()).unwrap();

        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn overflowing_lifetime_is_an_error_not_a_panic() {
        let tokens = service("secret");
        let result = tokens.issue_with_ttl(1, "a@x.com", Duration::MAX);

        assert!(matches!(result, Err(TokenError::ExpiryOutOfRange)));
    }

    #[test]
    fn garbage_is_malformed() {
        let tokens = service("secret");
        assert!(matches!(tokens.verify("not.a.jwt"), Err(TokenError::Malformed(_))));
        assert!(matches!(tokens.verify(""), Err(TokenError::Malformed(_))));
    }
}
