//! Background Workers
//!
//! - CronTriggerWorker: 周期产生定时事件

mod cron_trigger;

pub use cron_trigger::{CronTriggerWorker, Trigger};
