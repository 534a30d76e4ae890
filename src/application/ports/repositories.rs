//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite / 内存）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::UserId;

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// User Repository
// ============================================================================

/// 用户实体（用于持久化）
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}

/// User Repository Port
#[async_trait]
pub trait UserRepositoryPort: Send + Sync {
    /// 保存用户（id 已存在时返回 Duplicate）
    async fn save(&self, user: &UserRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError>;

    /// 列出所有用户（按创建时间升序）
    async fn find_all(&self) -> Result<Vec<UserRecord>, RepositoryError>;

    /// 更新用户邮箱（用户不存在时返回 NotFound）
    async fn update_email(&self, id: &UserId, email: &str) -> Result<UserRecord, RepositoryError>;
}

// ============================================================================
// Session Store
// ============================================================================

/// 会话实体（用于持久化）
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user_id: impl Into<UserId>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Session Store Port
///
/// 会话存储，由定时任务清理过期会话
#[async_trait]
pub trait SessionStorePort: Send + Sync {
    /// 保存会话
    async fn save(&self, session: &SessionRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找会话
    async fn find_by_id(&self, id: &str) -> Result<Option<SessionRecord>, RepositoryError>;

    /// 删除 `now` 之前过期的会话，返回删除数量
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}
