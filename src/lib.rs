//! Portico - 类型化 RPC 服务
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Identity: 调用者身份与认证状态
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SessionValidator, SessionStore, UserRepository）
//! - Context: 每请求上下文构造
//! - RPC: 过程路由、认证门、错误结构、transformer
//! - Procedures: hello / user 过程
//! - Scheduled: 定时事件分发
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: `/trpc/*` 传输 + CORS
//! - Auth: JWT 会话令牌验证
//! - Persistence: SQLite 存储
//! - Memory: 内存实现（测试与本地开发）
//! - Worker: 定时事件触发器

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
