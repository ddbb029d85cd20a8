//! 健康检查处理器
//! 提供 /health 和 /ready 端点

use axum::{extract::State, http::StatusCode, Json};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::{db::HealthStatus, middleware::AppState};

/// 应用启动时间
static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// 记录启动时间（main 中调用）
pub fn set_start_time() {
    Lazy::force(&START_TIME);
}

/// 存活探针响应
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// 就绪探针响应
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<HealthCheck>,
}

/// 健康检查项
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 存活探针
/// 快速响应，不检查依赖
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: START_TIME.elapsed().as_secs(),
    })
}

/// 就绪探针
/// 检查凭证存储是否可用
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let check = match state.store.health_check().await {
        HealthStatus::Healthy => HealthCheck {
            name: "credential_store".to_string(),
            status: "healthy".to_string(),
            message: None,
        },
        HealthStatus::Unhealthy(reason) => {
            tracing::warn!(reason = %reason, "Credential store unhealthy");
            HealthCheck {
                name: "credential_store".to_string(),
                status: "unhealthy".to_string(),
                message: Some(reason),
            }
        }
    };

    let ready = check.status == "healthy";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready,
            checks: vec![check],
        }),
    )
}
