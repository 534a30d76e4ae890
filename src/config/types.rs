//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 环境绑定（密钥、外部服务标识、公开 URL）
    #[serde(default)]
    pub bindings: Bindings,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 定时任务配置
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// RPC 挂载路径
    #[serde(default = "default_trpc_endpoint")]
    pub trpc_endpoint: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_trpc_endpoint() -> String {
    "/trpc".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trpc_endpoint: default_trpc_endpoint(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 环境绑定
///
/// OAuth、邮件等字段只做透传，核心逻辑只使用 `app_url` 与 `jwt_verification_key`
#[derive(Clone, Default, Deserialize)]
pub struct Bindings {
    /// 前端地址（CORS 允许的来源）
    #[serde(default)]
    pub app_url: Option<String>,

    /// 会话令牌验证密钥（HS256）
    #[serde(default)]
    pub jwt_verification_key: String,

    #[serde(default)]
    pub apple_client_id: Option<String>,
    #[serde(default)]
    pub apple_team_id: Option<String>,
    #[serde(default)]
    pub apple_key_id: Option<String>,
    #[serde(default)]
    pub apple_certificate: Option<String>,
    #[serde(default)]
    pub discord_client_id: Option<String>,
    #[serde(default)]
    pub discord_client_secret: Option<String>,
    #[serde(default)]
    pub github_client_id: Option<String>,
    #[serde(default)]
    pub github_client_secret: Option<String>,
    #[serde(default)]
    pub google_client_id: Option<String>,
    #[serde(default)]
    pub google_client_secret: Option<String>,

    /// 外发邮件服务密钥
    #[serde(default)]
    pub resend_api_key: Option<String>,

    #[serde(default)]
    pub public_support_email: Option<String>,
    #[serde(default)]
    pub public_api_url: Option<String>,
    #[serde(default)]
    pub public_native_scheme: Option<String>,
}

// 密钥不进日志
impl std::fmt::Debug for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("app_url", &self.app_url)
            .field("jwt_verification_key", &redact(&self.jwt_verification_key))
            .field("public_api_url", &self.public_api_url)
            .field("public_support_email", &self.public_support_email)
            .field("public_native_scheme", &self.public_native_scheme)
            .finish_non_exhaustive()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/portico.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 定时任务配置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// 是否启动内置触发器
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,

    /// 是否开放 `/__scheduled` 手动触发路由
    #[serde(default)]
    pub expose_test_route: bool,

    /// 触发过期会话清理的 cron 表达式（按字面匹配）
    #[serde(default = "default_purge_cron")]
    pub purge_expired_sessions_cron: String,

    /// 内置触发器列表
    #[serde(default = "default_triggers")]
    pub triggers: Vec<TriggerConfig>,
}

/// 触发器：每隔 `interval_secs` 秒以 `cron` 触发一次事件
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerConfig {
    pub cron: String,
    pub interval_secs: u64,
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_purge_cron() -> String {
    "15 2 0 * *".to_string()
}

fn default_triggers() -> Vec<TriggerConfig> {
    vec![TriggerConfig {
        cron: default_purge_cron(),
        interval_secs: 86400, // 1 天
    }]
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            expose_test_route: false,
            purge_expired_sessions_cron: default_purge_cron(),
            triggers: default_triggers(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.server.trpc_endpoint, "/trpc");
        assert_eq!(config.database.path, "data/portico.db");
        assert_eq!(config.scheduler.purge_expired_sessions_cron, "15 2 0 * *");
        assert_eq!(config.scheduler.triggers.len(), 1);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:8787");
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/portico.db?mode=rwc");
    }

    #[test]
    fn test_bindings_debug_hides_secrets() {
        let bindings = Bindings {
            jwt_verification_key: "super-secret".into(),
            github_client_secret: Some("gh-secret".into()),
            ..Bindings::default()
        };
        let printed = format!("{:?}", bindings);
        assert!(!printed.contains("super-secret"));
        assert!(!printed.contains("gh-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
