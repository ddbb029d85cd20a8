//! HTTP 中间件
//! 应用状态与请求追踪

use crate::{
    auth::{
        issuer::TokenIssuer, jwt::JwtService, legacy::LegacyTokenPolicy, password::PasswordHasher,
        verifier::TokenVerifier,
    },
    config::AppConfig,
    error::AppError,
    repository::CredentialStore,
    services::AuthService,
};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 启动时构建一次，通过 axum state 注入；不存在全局连接池
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn CredentialStore>,
    pub jwt_service: Arc<JwtService>,
    pub verifier: Arc<TokenVerifier>,
    pub issuer: Arc<TokenIssuer>,
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    /// 按配置组装验证器、签发器与登录服务
    pub fn build(
        config: AppConfig,
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
    ) -> Result<Self, AppError> {
        let jwt_service = Arc::new(JwtService::from_config(&config)?);
        let legacy = LegacyTokenPolicy::from_config(&config.security)?;

        if !jwt_service.is_configured() {
            tracing::warn!("No JWT secret configured; signed tokens will be rejected");
        }
        if legacy.is_active() {
            tracing::warn!(sunset = %legacy.sunset, "Legacy token formats are still accepted");
        }

        let verifier = Arc::new(TokenVerifier::new(
            store.clone(),
            jwt_service.clone(),
            legacy,
            config.security.dev_admin_stub,
        ));
        let issuer = Arc::new(TokenIssuer::new(jwt_service.clone(), legacy));
        let auth_service = Arc::new(AuthService::new(store.clone(), issuer.clone(), hasher));

        Ok(Self {
            config: Arc::new(config),
            store,
            jwt_service,
            verifier,
            issuer,
            auth_service,
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = start.elapsed();

        let status = response.status().as_u16();
        // 指标标签只用静态字符串
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "OTHER",
        };
        let status_class = match status {
            200..=299 => "2xx",
            401 => "401",
            403 => "403",
            423 => "423",
            400..=499 => "4xx",
            _ => "5xx",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        // 在响应头中回传追踪 ID
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_or_generate_trace_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "test-trace-123".parse().unwrap());

        let trace_id = extract_or_generate_trace_id(&headers);
        assert_eq!(trace_id, "test-trace-123");

        let headers = HeaderMap::new();
        let trace_id = extract_or_generate_trace_id(&headers);
        assert!(!trace_id.is_empty());
        assert_ne!(trace_id, "test-trace-123");
    }
}
