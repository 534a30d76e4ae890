//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SessionValidator、SessionStore、UserRepository）
//! - context: 请求上下文构造
//! - rpc: 过程路由、认证门、错误结构、线格式
//! - procedures: 应用过程
//! - scheduled: 定时任务分发

pub mod context;
pub mod ports;
pub mod procedures;
pub mod rpc;
pub mod scheduled;

// Re-exports
pub use context::{bearer_token, ContextBuilder, RequestContext, ResponseHeaders};

pub use ports::{
    AuthError, RepositoryError, SessionRecord, SessionStorePort, SessionValidatorPort,
    UserRecord, UserRepositoryPort,
};

pub use procedures::app_router;

pub use scheduled::{
    DispatchError, DispatchOutcome, Dispatcher, ScheduleRule, ScheduledAction, ScheduledEvent,
};
