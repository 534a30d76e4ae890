//! Scheduled-Task Dispatcher - 定时任务分发
//!
//! 按配置顺序匹配触发事件的 cron 表达式，第一条匹配的规则执行对应维护动作；
//! 没有匹配时只记录日志。cron 表达式视为不透明字符串，只做字面比较。
//! 动作失败直接返回给调用方，不重试。

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::context::{ContextBuilder, RequestContext};
use crate::application::ports::RepositoryError;

/// 定时触发事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    /// 触发该事件的 cron 表达式
    pub cron: String,
    /// 触发时间（毫秒时间戳）
    #[serde(default)]
    pub scheduled_time: i64,
}

impl ScheduledEvent {
    pub fn new(cron: impl Into<String>) -> Self {
        Self {
            cron: cron.into(),
            scheduled_time: Utc::now().timestamp_millis(),
        }
    }
}

/// 维护动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledAction {
    /// 清理过期会话
    PurgeExpiredSessions,
}

impl ScheduledAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduledAction::PurgeExpiredSessions => "purge_expired_sessions",
        }
    }

    /// 执行动作，返回受影响的记录数
    async fn perform(&self, ctx: &RequestContext) -> Result<u64, RepositoryError> {
        match self {
            ScheduledAction::PurgeExpiredSessions => ctx.sessions.delete_expired(Utc::now()).await,
        }
    }
}

/// 规则：cron 表达式 → 动作
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleRule {
    pub cron: String,
    pub action: ScheduledAction,
}

impl ScheduleRule {
    pub fn new(cron: impl Into<String>, action: ScheduledAction) -> Self {
        Self {
            cron: cron.into(),
            action,
        }
    }
}

/// 分发结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Performed {
        action: ScheduledAction,
        affected: u64,
    },
    Unhandled,
}

/// 分发错误
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Scheduled action {action:?} failed: {source}")]
    ActionFailed {
        action: ScheduledAction,
        #[source]
        source: RepositoryError,
    },
}

/// 定时任务分发器
pub struct Dispatcher {
    rules: Vec<ScheduleRule>,
    contexts: Arc<ContextBuilder>,
}

impl Dispatcher {
    pub fn new(rules: Vec<ScheduleRule>, contexts: Arc<ContextBuilder>) -> Self {
        Self { rules, contexts }
    }

    pub fn rules(&self) -> &[ScheduleRule] {
        &self.rules
    }

    /// 处理一次触发事件
    pub async fn dispatch(&self, event: &ScheduledEvent) -> Result<DispatchOutcome, DispatchError> {
        let ctx = self.contexts.for_scheduled();
        tracing::info!(cron = %event.cron, scheduled_time = event.scheduled_time, "Running cron");

        let Some(rule) = self.rules.iter().find(|rule| rule.cron == event.cron) else {
            tracing::info!(
                cron = %event.cron,
                scheduled_time = event.scheduled_time,
                "Unhandled cron event"
            );
            return Ok(DispatchOutcome::Unhandled);
        };

        let affected = rule
            .action
            .perform(&ctx)
            .await
            .map_err(|source| DispatchError::ActionFailed {
                action: rule.action,
                source,
            })?;

        tracing::info!(
            cron = %event.cron,
            action = rule.action.as_str(),
            affected = affected,
            "Scheduled action completed"
        );

        Ok(DispatchOutcome::Performed {
            action: rule.action,
            affected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        AuthError, SessionRecord, SessionStorePort, SessionValidatorPort,
    };
    use crate::config::Bindings;
    use crate::domain::Identity;
    use crate::infrastructure::memory::{InMemorySessionStore, InMemoryUserRepository};
    use async_trait::async_trait;
    use chrono::Duration;

    const PURGE_CRON: &str = "15 2 0 * *";

    struct RejectAll;

    #[async_trait]
    impl SessionValidatorPort for RejectAll {
        async fn validate(&self, _token: &str) -> Result<Option<Identity>, AuthError> {
            Ok(None)
        }
    }

    async fn dispatcher_with_sessions() -> (Dispatcher, Arc<InMemorySessionStore>) {
        let sessions = Arc::new(InMemorySessionStore::new());
        let now = Utc::now();
        for offset in [-7200, -60, 3600] {
            sessions
                .save(&SessionRecord::new("u1", now + Duration::seconds(offset)))
                .await
                .unwrap();
        }

        let contexts = Arc::new(ContextBuilder::new(
            Arc::new(Bindings::default()),
            Arc::new(RejectAll),
            Arc::new(InMemoryUserRepository::new()),
            sessions.clone(),
        ));
        let rules = vec![ScheduleRule::new(PURGE_CRON, ScheduledAction::PurgeExpiredSessions)];
        (Dispatcher::new(rules, contexts), sessions)
    }

    #[tokio::test]
    async fn test_matching_cron_purges_expired_sessions_once() {
        let (dispatcher, sessions) = dispatcher_with_sessions().await;

        let outcome = dispatcher.dispatch(&ScheduledEvent::new(PURGE_CRON)).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Performed {
                action: ScheduledAction::PurgeExpiredSessions,
                affected: 2,
            }
        );
        assert_eq!(sessions.len(), 1);

        // 再次触发不会删除未过期会话
        let outcome = dispatcher.dispatch(&ScheduledEvent::new(PURGE_CRON)).await.unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Performed {
                action: ScheduledAction::PurgeExpiredSessions,
                affected: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_cron_is_unhandled() {
        let (dispatcher, sessions) = dispatcher_with_sessions().await;

        let outcome = dispatcher.dispatch(&ScheduledEvent::new("0 * * * *")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert_eq!(sessions.len(), 3);
    }

    #[test]
    fn test_event_deserializes_host_payload() {
        let event: ScheduledEvent = serde_json::from_str(
            r#"{ "cron": "15 2 0 * *", "type": "scheduled", "scheduledTime": 1700000000000 }"#,
        )
        .unwrap();
        assert_eq!(event.cron, PURGE_CRON);
        assert_eq!(event.scheduled_time, 1_700_000_000_000);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(DispatchOutcome::Performed {
            action: ScheduledAction::PurgeExpiredSessions,
            affected: 3,
        })
        .unwrap();
        assert_eq!(json["outcome"], "performed");
        assert_eq!(json["action"], "purge_expired_sessions");
        assert_eq!(json["affected"], 3);
    }
}
