//! Session Validator Port - 会话令牌验证
//!
//! 令牌无效（签名错误、过期、格式错误）不是错误，返回 `Ok(None)`；
//! 只有验证基础设施本身失败时才返回 `Err`。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Identity;

/// 会话验证错误
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Verification key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Session validation failed: {0}")]
    ValidationFailed(String),
}

/// Session Validator Port
#[async_trait]
pub trait SessionValidatorPort: Send + Sync {
    /// 验证令牌，返回对应身份
    async fn validate(&self, token: &str) -> Result<Option<Identity>, AuthError>;
}
