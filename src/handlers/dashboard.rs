//! 受保护的示例端点
//! 授权在路由层完成，处理器只读取已附加的 Principal

use crate::{auth::principal::Principal, error::AppError};
use axum::{extract::Path, response::IntoResponse, Json};
use serde_json::json;

/// 种植者查看自己的农场
pub async fn grower_farm(
    principal: Principal,
    Path(farm_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let farm_name = principal
        .farm_id
        .is_some_and(|id| id.to_string() == farm_id)
        .then(|| principal.farm_name.clone())
        .flatten();

    Ok(Json(json!({
        "success": true,
        "farmId": farm_id,
        "farmName": farm_name,
        "viewer": principal.email,
    })))
}

/// 管理概览（角色 ≥ admin）
pub async fn admin_overview(principal: Principal) -> Result<impl IntoResponse, AppError> {
    Ok(Json(json!({
        "success": true,
        "section": "overview",
        "role": principal.role,
    })))
}

/// 报表（需要 reports.read 权限）
pub async fn admin_reports(principal: Principal) -> Result<impl IntoResponse, AppError> {
    Ok(Json(json!({
        "success": true,
        "section": "reports",
        "permissions": principal.permissions,
    })))
}

/// 用户管理（admin 或 super_admin）
pub async fn admin_users(principal: Principal) -> Result<impl IntoResponse, AppError> {
    Ok(Json(json!({
        "success": true,
        "section": "users",
        "role": principal.role,
    })))
}

/// 审核队列（content.moderate 或 users.manage）
pub async fn moderation_queue(principal: Principal) -> Result<impl IntoResponse, AppError> {
    Ok(Json(json!({
        "success": true,
        "section": "moderation",
        "moderator": principal.email,
    })))
}
