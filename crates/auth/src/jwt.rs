//! HS256 session tokens: issued by the login handler, verifiable by anyone
//! holding the same secret.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use thiserror::Error;

use orderdesk_core::SessionToken;

use crate::claims::{SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Signature + claims verification for session tokens.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

/// Issues and validates HS256-signed session tokens.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

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

    /// Sign a token for `email`, valid from `now` for the configured TTL.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> Result<SessionToken, TokenError> {
        let claims = SessionClaims::new(email, now, self.ttl);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(SessionToken {
            token,
            email: claims.email.clone(),
            expires_at: claims.expires_at(),
        })
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Claims(TokenValidationError::Expired),
                _ => TokenError::Invalid(e.to_string()),
            })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> Hs256Jwt {
        Hs256Jwt::new(secret, Duration::minutes(1000))
    }

    #[test]
    fn issued_token_validates_and_carries_email() {
        let jwt = service("test-secret");
        let now = Utc::now();

        let token = jwt.issue("a@b.com", now).unwrap();
        assert_eq!(token.email, "a@b.com");
        assert!(token.expires_at > now);

        let claims = jwt.validate(&token.token, now).unwrap();
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp, token.expires_at.timestamp());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = service("one").issue("a@b.com", now).unwrap();

        assert!(matches!(
            service("two").validate(&token.token, now),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = Hs256Jwt::new("test-secret", Duration::minutes(1));
        let issued = Utc::now() - Duration::days(2);
        let token = jwt.issue("a@b.com", issued).unwrap();

        assert_eq!(
            jwt.validate(&token.token, Utc::now()),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            service("test-secret").validate("not.a.token", Utc::now()),
            Err(TokenError::Invalid(_))
        ));
    }
}
