//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod auth;
pub mod http;
pub mod memory;
pub mod persistence;
pub mod worker;

pub use auth::JwtSessionValidator;
pub use memory::{InMemorySessionStore, InMemoryUserRepository};
pub use persistence::sqlite::{SqliteSessionStore, SqliteUserRepository};
pub use worker::CronTriggerWorker;
