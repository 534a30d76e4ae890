//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `PORTICO_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `PORTICO_SERVER__PORT=8787`
/// - `PORTICO_BINDINGS__APP_URL=http://localhost:3000`
/// - `PORTICO_BINDINGS__JWT_VERIFICATION_KEY=...`
/// - `PORTICO_DATABASE__PATH=/data/portico.db`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8787)?
        .set_default("server.trpc_endpoint", "/trpc")?
        .set_default("database.path", "data/portico.db")?
        .set_default("database.max_connections", 5)?
        .set_default("scheduler.enabled", true)?
        .set_default("scheduler.expose_test_route", false)?
        .set_default("scheduler.purge_expired_sessions_cron", "15 2 0 * *")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: PORTICO_BINDINGS__APP_URL=http://localhost:3000
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("PORTICO")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if !config.server.trpc_endpoint.starts_with('/') || config.server.trpc_endpoint.len() < 2 {
        return Err(ConfigError::ValidationError(format!(
            "RPC endpoint must be an absolute path, got {:?}",
            config.server.trpc_endpoint
        )));
    }

    if config.bindings.jwt_verification_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "JWT verification key cannot be empty".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.scheduler.enabled {
        if let Some(trigger) = config.scheduler.triggers.iter().find(|t| t.interval_secs == 0) {
            return Err(ConfigError::ValidationError(format!(
                "Trigger interval cannot be 0 (cron {:?})",
                trigger.cron
            )));
        }
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志，不含密钥）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!("RPC Endpoint: {}", config.server.trpc_endpoint);
    match &config.bindings.app_url {
        Some(url) => tracing::info!("App URL (CORS origin): {}", url),
        None => tracing::info!("App URL (CORS origin): <unset>"),
    }
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Scheduler Enabled: {}", config.scheduler.enabled);
    if config.scheduler.enabled {
        for trigger in &config.scheduler.triggers {
            tracing::info!("Trigger: {:?} every {}s", trigger.cron, trigger.interval_secs);
        }
    }
    tracing::info!("Purge Sessions Cron: {:?}", config.scheduler.purge_expired_sessions_cron);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.bindings.jwt_verification_key = "12345".to_string();
        config
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validation_error_for_missing_jwt_key() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_relative_endpoint() {
        let mut config = valid_config();
        config.server.trpc_endpoint = "trpc".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_db_path() {
        let mut config = valid_config();
        config.database.path = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_trigger_interval() {
        let mut config = valid_config();
        config.scheduler.triggers[0].interval_secs = 0;
        assert!(validate_config(&config).is_err());

        config.scheduler.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[bindings]
app_url = "http://localhost:3000"
jwt_verification_key = "from-file"

[scheduler]
purge_expired_sessions_cron = "0 3 * * *"
triggers = [{{ cron = "0 3 * * *", interval_secs = 60 }}]
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.trpc_endpoint, "/trpc");
        assert_eq!(config.bindings.app_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.bindings.jwt_verification_key, "from-file");
        assert_eq!(config.scheduler.purge_expired_sessions_cron, "0 3 * * *");
        assert_eq!(config.scheduler.triggers[0].interval_secs, 60);
    }
}
