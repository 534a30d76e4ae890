//! JWT Session Validator
//!
//! HS256 会话令牌验证，claims 为 `{ sub, exp }`

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::application::ports::{AuthError, SessionValidatorPort};
use crate::domain::{Identity, UserId};

/// 默认令牌有效期：7 天
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// JWT 会话验证器
pub struct JwtSessionValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionValidator {
    pub fn new(verification_key: &str) -> Result<Self, AuthError> {
        if verification_key.is_empty() {
            return Err(AuthError::KeyUnavailable(
                "JWT verification key is empty".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(verification_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(verification_key.as_bytes()),
            validation,
        })
    }

    /// 为用户签发会话令牌
    pub fn issue_token(&self, user_id: &UserId, ttl: Duration) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::ValidationFailed(e.to_string()))
    }
}

#[async_trait]
impl SessionValidatorPort for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) if !data.claims.sub.is_empty() => Ok(Some(Identity::new(data.claims.sub))),
            Ok(_) => Ok(None),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("Session token expired"),
                    kind => tracing::debug!(error = ?kind, "Session token rejected"),
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "12345";

    #[tokio::test]
    async fn test_issued_token_validates() {
        let validator = JwtSessionValidator::new(KEY).unwrap();
        let token = validator
            .issue_token(&UserId::new("test-user"), Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
            .unwrap();

        let identity = validator.validate(&token).await.unwrap().unwrap();
        assert_eq!(identity.user_id.as_str(), "test-user");
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let validator = JwtSessionValidator::new(KEY).unwrap();
        let token = validator
            .issue_token(&UserId::new("test-user"), Duration::seconds(-60))
            .unwrap();

        assert!(validator.validate(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected() {
        let issuer = JwtSessionValidator::new("other-key").unwrap();
        let token = issuer
            .issue_token(&UserId::new("test-user"), Duration::hours(1))
            .unwrap();

        let validator = JwtSessionValidator::new(KEY).unwrap();
        assert!(validator.validate(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let validator = JwtSessionValidator::new(KEY).unwrap();
        assert!(validator.validate("not.a.jwt").await.unwrap().is_none());
    }

    #[test]
    fn test_empty_key_is_an_error() {
        assert!(matches!(
            JwtSessionValidator::new(""),
            Err(AuthError::KeyUnavailable(_))
        ));
    }
}
