//! HTTP Routes
//!
//! API Endpoints:
//! - {endpoint}/*path   GET/POST   RPC 传输（CORS 限定前端来源）
//! - /ping              GET        健康检查
//! - /__scheduled       GET        手动触发定时事件（可选）

use axum::{
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes(
    trpc_endpoint: &str,
    cors: CorsLayer,
    expose_scheduled: bool,
) -> Router<Arc<AppState>> {
    let mut router = Router::new()
        .route("/ping", get(handlers::ping))
        .merge(trpc_routes(trpc_endpoint).layer(cors));

    if expose_scheduled {
        router = router.route("/__scheduled", get(handlers::trigger_scheduled));
    }

    router
}

/// RPC 路由
fn trpc_routes(endpoint: &str) -> Router<Arc<AppState>> {
    let endpoint = endpoint.trim_end_matches('/');
    Router::new().route(&format!("{}/*path", endpoint), any(handlers::trpc_handler))
}
