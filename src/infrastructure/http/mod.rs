//! HTTP Layer - RPC 传输适配
//!
//! 将 HTTP 请求翻译为过程调用，并提供健康检查与定时事件调试路由

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::create_routes;
pub use server::{HttpServer, ServerConfig};
pub use state::AppState;
