//! 认证相关的 HTTP 处理器

use crate::{
    auth::principal::{OptionalPrincipal, Principal},
    error::AppError,
    middleware::AppState,
    models::auth::LoginRequest,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// 种植者登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let response = state.auth_service.login_grower(req).await?;

    Ok(Json(response))
}

/// 后台管理员登录
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let response = state.auth_service.login_admin(req).await?;

    Ok(Json(response))
}

/// 获取当前用户信息
pub async fn me(principal: Principal) -> Result<impl IntoResponse, AppError> {
    Ok(Json(json!({
        "success": true,
        "user": principal,
    })))
}

/// 可选认证：报告请求是否携带了有效身份
pub async fn session(OptionalPrincipal(principal): OptionalPrincipal) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "authenticated": principal.is_some(),
        "user": principal,
    }))
}
