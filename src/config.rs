//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use chrono::NaiveDate;
use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
    /// 运行环境: development, staging, production
    pub environment: String,
    /// 请求体大小上限（字节）
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    pub url: Secret<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// JWT 签名密钥（未设置时拒绝所有结构化令牌）
    #[serde(default)]
    pub jwt_secret: Option<Secret<String>>,
    /// 签名令牌过期时间（秒）
    pub token_exp_secs: u64,
    /// 是否接受旧版前缀令牌 (grower-token- / user-token- / admin-token-)
    pub legacy_tokens_enabled: bool,
    /// 旧版前缀令牌的移除日期 (YYYY-MM-DD)，过期后一律拒绝
    pub legacy_tokens_sunset: String,
    /// 开发环境专用：admin-token- 直接解析为内置超级管理员
    pub dev_admin_stub: bool,
}

impl SecurityConfig {
    /// 解析旧版令牌移除日期
    pub fn legacy_sunset_date(&self) -> Result<NaiveDate, ConfigError> {
        NaiveDate::parse_from_str(&self.legacy_tokens_sunset, "%Y-%m-%d").map_err(|e| {
            ConfigError::Message(format!(
                "Invalid legacy_tokens_sunset '{}': {}",
                self.legacy_tokens_sunset, e
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("server.environment", "production")?
            .set_default("server.body_limit_bytes", 1024 * 1024)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.token_exp_secs", 86400)?
            .set_default("security.legacy_tokens_enabled", true)?
            .set_default("security.legacy_tokens_sunset", "2027-06-30")?
            .set_default("security.dev_admin_stub", false)?;

        // 从环境变量加载配置（前缀为 CAFE_）
        settings = settings.add_source(
            Environment::with_prefix("CAFE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证端口范围
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        // 验证运行环境
        match self.server.environment.to_lowercase().as_str() {
            "development" | "staging" | "production" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid environment: {}. Must be one of: development, staging, production",
                    self.server.environment
                )))
            }
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        // 验证数据库连接池配置
        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        // 验证 JWT 密钥长度（至少 32 字符）；未设置时结构化令牌全部拒绝
        if let Some(secret) = &self.security.jwt_secret {
            if secret.expose_secret().len() < 32 {
                return Err(ConfigError::Message(
                    "JWT secret must be at least 32 characters long".to_string(),
                ));
            }
        }

        // 验证令牌过期时间
        if self.security.token_exp_secs < 60 || self.security.token_exp_secs > 86400 {
            return Err(ConfigError::Message(
                "token_exp_secs must be between 60 and 86400 (1 minute to 24 hours)".to_string(),
            ));
        }

        self.security.legacy_sunset_date()?;

        // 内置超级管理员仅限开发环境
        if self.security.dev_admin_stub && !self.server.is_development() {
            return Err(ConfigError::Message(
                "dev_admin_stub is only allowed when server.environment = development".to_string(),
            ));
        }

        Ok(())
    }
}
