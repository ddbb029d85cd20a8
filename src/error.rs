//! 统一错误模型
//! 定义所有错误类型和错误响应格式 `{success: false, error, message, ...}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 是否在错误响应中附带内部细节（仅开发环境，启动时设置一次）
static EXPOSE_DETAILS: OnceCell<bool> = OnceCell::new();

pub fn set_expose_details(enabled: bool) {
    let _ = EXPOSE_DETAILS.set(enabled);
}

fn expose_details() -> bool {
    EXPOSE_DETAILS.get().copied().unwrap_or(false)
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// 缺少或无法解析的 Authorization 头
    #[error("Authentication required")]
    AuthenticationRequired,

    /// 令牌可解析但验证失败，或未解析到有效账户
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Access denied: {message}")]
    Forbidden {
        message: String,
        required: Option<String>,
        actual: Option<String>,
    },

    #[error("Account locked")]
    AccountLocked,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 请求体超过 server.body_limit_bytes
    #[error("Payload too large")]
    PayloadTooLarge,

    /// 认证过程中的存储/基础设施故障（与凭证失败区分）
    #[error("Authentication backend error: {0}")]
    InternalAuth(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthenticationRequired
            | AppError::InvalidToken(_)
            | AppError::TokenExpired
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::AccountLocked => StatusCode::LOCKED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::InternalAuth(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 稳定的错误标识，供客户端区分“请登录”与“无权限”
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::AuthenticationRequired => "authentication_required",
            AppError::InvalidToken(_) => "invalid_token",
            AppError::TokenExpired => "token_expired",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Forbidden { .. } => "forbidden",
            AppError::AccountLocked => "account_locked",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::PayloadTooLarge => "payload_too_large",
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::InternalAuth(_)
            | AppError::Internal(_) => "internal_error",
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::AuthenticationRequired => "Authentication required".to_string(),
            AppError::InvalidToken(_) => "Invalid token".to_string(),
            AppError::TokenExpired => "Token expired".to_string(),
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::Forbidden { message, .. } => message.clone(),
            AppError::AccountLocked => "Account is temporarily locked".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => format!("Resource not found: {}", msg),
            AppError::PayloadTooLarge => "Request body too large".to_string(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::InternalAuth(_) => "Authentication service unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    // 便捷方法
    pub fn invalid_token(reason: &str) -> Self {
        AppError::InvalidToken(reason.to_string())
    }

    pub fn forbidden(msg: &str) -> Self {
        AppError::Forbidden {
            message: msg.to_string(),
            required: None,
            actual: None,
        }
    }

    /// 角色不足，响应中同时给出所需角色与实际角色
    pub fn forbidden_role(required: &str, actual: &str) -> Self {
        AppError::Forbidden {
            message: format!("Role '{}' required, current role is '{}'", required, actual),
            required: Some(required.to_string()),
            actual: Some(actual.to_string()),
        }
    }

    pub fn internal_auth(msg: &str) -> Self {
        AppError::InternalAuth(msg.to_string())
    }

    pub fn validation(msg: &str) -> Self {
        AppError::Validation(msg.to_string())
    }

    /// 是否为认证失败（401）
    pub fn is_authentication_failure(&self) -> bool {
        self.status_code() == StatusCode::UNAUTHORIZED
    }
}

/// 错误响应 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn from_error(error: &AppError, include_details: bool) -> Self {
        let (required, actual) = match error {
            AppError::Forbidden {
                required, actual, ..
            } => (required.clone(), actual.clone()),
            _ => (None, None),
        };

        Self {
            success: false,
            error: error.error_code().to_string(),
            message: error.user_message(),
            request_id: uuid::Uuid::new_v4().to_string(),
            required,
            actual,
            details: include_details.then(|| error.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = ErrorResponse::from_error(&self, expose_details());

        // 记录错误日志
        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.request_id,
                "Application error"
            );
        } else {
            tracing::debug!(
                code = self.code(),
                message = %self,
                request_id = %error_response.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// 从 validator::ValidationErrors 转换
impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}
