//! In-Memory Session Store Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::application::ports::{RepositoryError, SessionRecord, SessionStorePort};

/// 内存会话存储
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorePort for InMemorySessionStore {
    async fn save(&self, session: &SessionRecord) -> Result<(), RepositoryError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        let deleted = before.saturating_sub(self.sessions.len()) as u64;
        tracing::debug!(deleted = deleted, "Expired sessions deleted");
        Ok(deleted)
    }
}
