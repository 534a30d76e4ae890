//! Portico - 类型化 RPC 服务
//!
//! 启动顺序：配置 → 日志 → 数据库 → 上下文构造 → 过程路由 → 定时触发器 → HTTP

use std::sync::Arc;

use portico::application::context::ContextBuilder;
use portico::application::procedures::app_router;
use portico::application::scheduled::{Dispatcher, ScheduleRule, ScheduledAction};
use portico::config::{load_config, print_config, AppConfig};
use portico::infrastructure::auth::JwtSessionValidator;
use portico::infrastructure::http::{AppState, HttpServer, ServerConfig};
use portico::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteSessionStore, SqliteUserRepository,
};
use portico::infrastructure::worker::{CronTriggerWorker, Trigger};
use tokio::sync::watch;

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},portico={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Portico v{}", env!("CARGO_PKG_VERSION"));
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 创建存储适配器
    let users = Arc::new(SqliteUserRepository::new(pool.clone()));
    let sessions = Arc::new(SqliteSessionStore::new(pool));

    // 会话令牌验证
    let validator = Arc::new(
        JwtSessionValidator::new(&config.bindings.jwt_verification_key)
            .map_err(|e| anyhow::anyhow!("Failed to init session validator: {}", e))?,
    );

    let bindings = Arc::new(config.bindings.clone());
    let contexts = Arc::new(ContextBuilder::new(
        bindings,
        validator,
        users,
        sessions,
    ));

    // 过程路由（路径冲突在启动时暴露）
    let router = Arc::new(app_router().map_err(|e| anyhow::anyhow!("Invalid router: {}", e))?);
    tracing::info!(procedures = ?router.paths(), "RPC router ready");

    // 定时事件分发
    let dispatcher = Arc::new(Dispatcher::new(
        vec![ScheduleRule::new(
            config.scheduler.purge_expired_sessions_cron.clone(),
            ScheduledAction::PurgeExpiredSessions,
        )],
        contexts.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = if config.scheduler.enabled {
        let triggers = config.scheduler.triggers.iter().map(Trigger::from).collect();
        let worker = CronTriggerWorker::new(triggers, dispatcher.clone(), shutdown_rx);
        Some(tokio::spawn(worker.run()))
    } else {
        tracing::info!("Scheduler disabled");
        None
    };

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port)
        .with_trpc_endpoint(&config.server.trpc_endpoint)
        .with_app_url(config.bindings.app_url.clone())
        .with_scheduled_route(config.scheduler.expose_test_route);
    let state = AppState::new(router, contexts, dispatcher);
    let server = HttpServer::new(server_config, state);

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Scheduler task failed");
        }
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}
