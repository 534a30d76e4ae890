//! In-Memory User Repository Implementation

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::ports::{RepositoryError, UserRecord, UserRepositoryPort};
use crate::domain::UserId;

/// 内存用户仓储
pub struct InMemoryUserRepository {
    users: DashMap<UserId, UserRecord>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepositoryPort for InMemoryUserRepository {
    async fn save(&self, user: &UserRecord) -> Result<(), RepositoryError> {
        match self.users.entry(user.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RepositoryError::Duplicate(format!("user {}", user.id)))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let mut users: Vec<UserRecord> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn update_email(&self, id: &UserId, email: &str) -> Result<UserRecord, RepositoryError> {
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))?;
        user.email = email.to_string();
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_lifecycle() {
        let repo = InMemoryUserRepository::new();
        let user = UserRecord::new("u1", "u1@example.com");

        repo.save(&user).await.unwrap();
        assert!(matches!(
            repo.save(&user).await,
            Err(RepositoryError::Duplicate(_))
        ));

        let updated = repo.update_email(&user.id, "new@example.com").await.unwrap();
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }
}
