//! Identity - 调用者身份
//!
//! 请求上下文中的身份用标签变体表示，而不是可空字段：
//! 授权检查因此是对 [`Auth`] 的完整 match。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 用户标识（会话令牌中的 subject）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// 已验证的身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

impl Identity {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// 请求的认证状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Auth {
    /// 无凭证或凭证无效
    #[default]
    Anonymous,
    /// 凭证有效
    Authenticated(Identity),
}

impl Auth {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Auth::Anonymous => None,
            Auth::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Auth::Authenticated(_))
    }
}

impl From<Option<Identity>> for Auth {
    fn from(identity: Option<Identity>) -> Self {
        match identity {
            Some(identity) => Auth::Authenticated(identity),
            None => Auth::Anonymous,
        }
    }
}
