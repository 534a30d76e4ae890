//! SQLite Session Store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::DbPool;
use crate::application::ports::{RepositoryError, SessionRecord, SessionStorePort};
use crate::domain::UserId;

/// SQLite Session Store
pub struct SqliteSessionStore {
    pool: DbPool,
}

impl SqliteSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    expires_at: i64,
}

impl TryFrom<SessionRow> for SessionRecord {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let expires_at = DateTime::<Utc>::from_timestamp_millis(row.expires_at).ok_or_else(|| {
            RepositoryError::SerializationError(format!("invalid expires_at: {}", row.expires_at))
        })?;
        Ok(SessionRecord {
            id: row.id,
            user_id: UserId::new(row.user_id),
            expires_at,
        })
    }
}

#[async_trait]
impl SessionStorePort for SqliteSessionStore {
    async fn save(&self, session: &SessionRecord) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.id)
            .bind(session.user_id.as_str())
            .bind(session.expires_at.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT id, user_id, expires_at FROM sessions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(SessionRecord::try_from).transpose()
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let deleted = result.rows_affected();
        tracing::debug!(deleted = deleted, "Expired sessions deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{UserRecord, UserRepositoryPort};
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteUserRepository,
    };
    use chrono::Duration;

    #[tokio::test]
    async fn test_delete_expired_keeps_live_sessions() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteUserRepository::new(pool.clone())
            .save(&UserRecord::new("u1", "u1@example.com"))
            .await
            .unwrap();
        let store = SqliteSessionStore::new(pool);

        let now = Utc::now();
        let expired = SessionRecord::new("u1", now - Duration::hours(1));
        let live = SessionRecord::new("u1", now + Duration::hours(1));
        store.save(&expired).await.unwrap();
        store.save(&live).await.unwrap();

        assert_eq!(store.delete_expired(now).await.unwrap(), 1);
        assert!(store.find_by_id(&expired.id).await.unwrap().is_none());

        let kept = store.find_by_id(&live.id).await.unwrap().unwrap();
        assert_eq!(kept.expires_at.timestamp_millis(), live.expires_at.timestamp_millis());

        assert_eq!(store.delete_expired(now).await.unwrap(), 0);
    }
}
