//! Cron Trigger Worker - 定时触发器
//!
//! 按配置周期产生 [`ScheduledEvent`] 并交给分发器。
//! 分发失败只记录日志，下一个周期照常触发。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::application::scheduled::{Dispatcher, ScheduledEvent};
use crate::config::TriggerConfig;

/// 单个触发器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub cron: String,
    pub period: Duration,
}

impl From<&TriggerConfig> for Trigger {
    fn from(config: &TriggerConfig) -> Self {
        Self {
            cron: config.cron.clone(),
            period: Duration::from_secs(config.interval_secs),
        }
    }
}

/// 触发器 Worker
pub struct CronTriggerWorker {
    triggers: Vec<Trigger>,
    dispatcher: Arc<Dispatcher>,
    shutdown: watch::Receiver<bool>,
}

impl CronTriggerWorker {
    pub fn new(
        triggers: Vec<Trigger>,
        dispatcher: Arc<Dispatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            triggers,
            dispatcher,
            shutdown,
        }
    }

    /// 启动 Worker，直到收到关闭信号
    pub async fn run(self) {
        tracing::info!(triggers = self.triggers.len(), "CronTriggerWorker started");

        let handles: Vec<_> = self
            .triggers
            .into_iter()
            .map(|trigger| {
                tokio::spawn(Self::run_trigger(
                    trigger,
                    self.dispatcher.clone(),
                    self.shutdown.clone(),
                ))
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Trigger task panicked");
            }
        }

        tracing::info!("CronTriggerWorker stopped");
    }

    async fn run_trigger(
        trigger: Trigger,
        dispatcher: Arc<Dispatcher>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(trigger.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即完成，启动时不触发
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let event = ScheduledEvent::new(trigger.cron.clone());
                    if let Err(e) = dispatcher.dispatch(&event).await {
                        tracing::error!(cron = %trigger.cron, error = %e, "Scheduled event failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(cron = %trigger.cron, "Trigger stopped");
    }
}
