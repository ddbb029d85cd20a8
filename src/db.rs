//! 凭证库连接池
//! 只读访问外部维护的 MySQL 凭证库；连接池启动时创建一次，经 AppState 注入

use crate::{config::DatabaseConfig, error::AppError};
use secrecy::ExposeSecret;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::time::Duration;

/// 按配置构建连接池参数
pub fn pool_options(config: &DatabaseConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
}

/// 连接凭证库；启动时连不上即失败
pub async fn create_pool(config: &DatabaseConfig) -> Result<MySqlPool, AppError> {
    let pool = pool_options(config)
        .connect(config.url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Credential database unreachable");
            AppError::Database(e)
        })?;

    tracing::info!(
        max_connections = config.max_connections,
        "Credential database pool ready"
    );
    Ok(pool)
}

pub async fn close_pool(pool: &MySqlPool) {
    pool.close().await;
    tracing::info!("Credential database pool closed");
}

/// `SELECT 1` 探活，同时上报连接池占用
pub async fn ping(pool: &MySqlPool) -> HealthStatus {
    metrics::gauge!("credential_db_pool_size").set(pool.size() as f64);
    metrics::gauge!("credential_db_pool_idle").set(pool.num_idle() as f64);

    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => HealthStatus::Healthy,
        Err(e) => {
            tracing::warn!(error = %e, "Credential database ping failed");
            HealthStatus::Unhealthy(e.to_string())
        }
    }
}

/// 凭证库可用性
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}
