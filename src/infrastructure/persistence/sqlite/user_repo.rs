//! SQLite User Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{RepositoryError, UserRecord, UserRepositoryPort};
use crate::domain::UserId;

/// SQLite User Repository
pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    created_at: String,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRecord {
            id: UserId::new(row.id),
            email: row.email,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

fn map_db_error(e: sqlx::Error, id: &UserId) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Duplicate(format!("user {}", id))
        }
        _ => RepositoryError::DatabaseError(e.to_string()),
    }
}

#[async_trait]
impl UserRepositoryPort for SqliteUserRepository {
    async fn save(&self, user: &UserRecord) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO users (id, email, created_at) VALUES (?, ?, ?)")
            .bind(user.id.as_str())
            .bind(&user.email)
            .bind(user.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(e, &user.id))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, created_at FROM users WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, email, created_at FROM users ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(UserRecord::try_from).collect()
    }

    async fn update_email(&self, id: &UserId, email: &str) -> Result<UserRecord, RepositoryError> {
        let result = sqlx::query("UPDATE users SET email = ? WHERE id = ?")
            .bind(email)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("user {}", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))
    }
}
