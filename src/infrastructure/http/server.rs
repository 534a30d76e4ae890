//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::middleware::status_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// RPC 挂载路径
    pub trpc_endpoint: String,
    /// 前端来源（CORS），未设置时拒绝所有跨域请求
    pub app_url: Option<String>,
    /// 是否开放 `/__scheduled`
    pub expose_scheduled_route: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            trpc_endpoint: "/trpc".to_string(),
            app_url: None,
            expose_scheduled_route: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_trpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.trpc_endpoint = endpoint.into();
        self
    }

    pub fn with_app_url(mut self, app_url: Option<String>) -> Self {
        self.app_url = app_url;
        self
    }

    pub fn with_scheduled_route(mut self, expose: bool) -> Self {
        self.expose_scheduled_route = expose;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// RPC 路由的 CORS 配置
///
/// 只允许前端来源，允许携带凭证
fn cors_layer(app_url: Option<&str>) -> CorsLayer {
    let origin = match app_url.map(|url| url.trim_end_matches('/')) {
        Some(url) => match HeaderValue::from_str(url) {
            Ok(value) => AllowOrigin::list([value]),
            Err(e) => {
                tracing::warn!(app_url = %url, error = %e, "Invalid APP_URL, CORS requests will be rejected");
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        },
        None => {
            tracing::warn!("APP_URL is not set. CORS errors may occur. Set bindings.app_url (PORTICO_BINDINGS__APP_URL)");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// 创建新的 HTTP 服务器
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// 构建 Router
    pub fn router(&self) -> Router {
        let cors = cors_layer(self.config.app_url.as_deref());

        create_routes(
            &self.config.trpc_endpoint,
            cors,
            self.config.expose_scheduled_route,
        )
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware::from_fn(status_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(self.state.clone())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let addr = self.config.addr();

        info!(
            "Starting HTTP server on {} (RPC endpoint {})",
            addr, self.config.trpc_endpoint
        );

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}
