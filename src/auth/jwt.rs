//! Signed, time-bound bearer tokens (HS256 JWTs).
//!
//! Access and refresh tokens are signed with independent secrets. Only HS256
//! is accepted on validation and there is no expiry leeway.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::errors::{AuthErrorType, CampusError};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // Profile email
    pub exp: u64,
    pub iat: u64,
    pub jti: String, // Random per token so same-second tokens differ
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token subject must not be empty")]
    EmptySubject,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<TokenError> for CampusError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => CampusError::auth(err.to_string(), AuthErrorType::ExpiredToken),
            TokenError::BadSignature | TokenError::Malformed => {
                CampusError::auth(err.to_string(), AuthErrorType::InvalidToken)
            }
            TokenError::EmptySubject => CampusError::validation_field(err.to_string(), "email"),
            TokenError::Signing(_) => CampusError::internal(err.to_string()),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default()
}

/// Signing material for one token class.
pub struct TokenKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        if subject.is_empty() {
            return Err(TokenError::EmptySubject);
        }

        let now = unix_now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: now + self.ttl.as_secs(),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::BadSignature
                }
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }
}

/// Issue a token for `subject` signed with `secret`, valid for `ttl`.
pub fn issue_token(subject: &str, secret: &[u8], ttl: Duration) -> Result<String, TokenError> {
    TokenKeys::new(secret, ttl).issue(subject)
}

/// Validate a token signed with `secret` and return its claims.
pub fn validate_token(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    TokenKeys::new(secret, Duration::ZERO).validate(token)
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and validates both token classes.
pub struct TokenIssuer {
    access: TokenKeys,
    refresh: TokenKeys,
}

impl TokenIssuer {
    pub fn new(access: TokenKeys, refresh: TokenKeys) -> Self {
        Self { access, refresh }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            TokenKeys::new(config.access_secret.as_bytes(), config.access_ttl()),
            TokenKeys::new(config.refresh_secret.as_bytes(), config.refresh_ttl()),
        )
    }

    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.access.issue(subject)?,
            refresh_token: self.refresh.issue(subject)?,
        })
    }

    pub fn validate_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.access.validate(token)
    }

    pub fn validate_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.refresh.validate(token)
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh.ttl()
    }
}

#[cfg(test)]
pub(crate) fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(
        TokenKeys::new(b"test-access-secret-test-access-secret", Duration::from_secs(60)),
        TokenKeys::new(b"test-refresh-secret-test-refresh-secret", Duration::from_secs(3600)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_A: &[u8] = b"secret-a-secret-a-secret-a-secret-a";
    const SECRET_B: &[u8] = b"secret-b-secret-b-secret-b-secret-b";
    const HOUR: Duration = Duration::from_secs(3600);

    fn encode_raw(claims: &Claims, header: &Header, secret: &[u8]) -> String {
        encode(header, claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn issued_token_validates_to_same_subject() {
        let token = issue_token("alice@example.com", SECRET_A, HOUR).unwrap();
        let claims = validate_token(&token, SECRET_A).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.exp, claims.iat + 3600);
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn empty_subject_is_rejected() {
        assert_eq!(issue_token("", SECRET_A, HOUR), Err(TokenError::EmptySubject));
    }

    #[test]
    fn other_secret_never_validates() {
        let token = issue_token("alice@example.com", SECRET_A, HOUR).unwrap();
        assert_eq!(validate_token(&token, SECRET_B), Err(TokenError::BadSignature));
    }

    #[test]
    fn same_second_tokens_are_distinct() {
        let keys = TokenKeys::new(SECRET_A, HOUR);
        let first = keys.issue("alice@example.com").unwrap();
        let second = keys.issue("alice@example.com").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = unix_now();
        let claims = Claims {
            sub: "alice@example.com".into(),
            exp: now - 5,
            iat: now - 65,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode_raw(&claims, &Header::new(Algorithm::HS256), SECRET_A);
        assert_eq!(validate_token(&token, SECRET_A), Err(TokenError::Expired));
    }

    #[test]
    fn other_hmac_algorithm_is_rejected() {
        let now = unix_now();
        let claims = Claims {
            sub: "alice@example.com".into(),
            exp: now + 60,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode_raw(&claims, &Header::new(Algorithm::HS512), SECRET_A);
        assert!(validate_token(&token, SECRET_A).is_err());
    }

    #[test]
    fn unsigned_token_is_rejected() {
        // {"alg":"none","typ":"JWT"} . {"sub":"alice@example.com","exp":4102444800} . <empty>
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
                     eyJzdWIiOiJhbGljZUBleGFtcGxlLmNvbSIsImV4cCI6NDEwMjQ0NDgwMH0.";
        assert!(validate_token(token, SECRET_A).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(validate_token("not.a.jwt", SECRET_A), Err(TokenError::Malformed));
        assert_eq!(validate_token("", SECRET_A), Err(TokenError::Malformed));
    }

    #[test]
    fn access_and_refresh_are_not_interchangeable() {
        let issuer = TokenIssuer::new(TokenKeys::new(SECRET_A, HOUR), TokenKeys::new(SECRET_B, HOUR));
        let pair = issuer.issue_pair("alice@example.com").unwrap();
        assert!(issuer.validate_access(&pair.access_token).is_ok());
        assert!(issuer.validate_refresh(&pair.refresh_token).is_ok());
        assert!(issuer.validate_access(&pair.refresh_token).is_err());
        assert!(issuer.validate_refresh(&pair.access_token).is_err());
    }

    #[test]
    fn token_errors_map_to_auth_errors() {
        let expired: CampusError = TokenError::Expired.into();
        assert_eq!(expired.auth_error_type(), Some(AuthErrorType::ExpiredToken));
        let forged: CampusError = TokenError::BadSignature.into();
        assert_eq!(forged.auth_error_type(), Some(AuthErrorType::InvalidToken));
    }
}
