//! 路由注册
//! 创建所有 API 路由并应用中间件
//!
//! 认证层（require_auth）始终包在授权层（authorize）外侧：
//! 未认证的请求先得到 401，不会落到 403。

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{
    auth::{
        middleware::{authorize, optional_auth, require_auth, RouteGuard},
        policy::Requirement,
        role::Role,
    },
    handlers,
    middleware::{request_tracking_middleware, AppState},
};

/// 允许访问用户管理的角色
const USER_ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];

/// 审核队列所需权限（任一即可）
const MODERATION_PERMISSIONS: &[&str] = &["content.moderate", "users.manage"];

/// 单条带授权要求的路由
fn guarded(
    state: &AppState,
    path: &str,
    method_router: MethodRouter<Arc<AppState>>,
    requirement: Requirement,
) -> Router<Arc<AppState>> {
    let guard = RouteGuard {
        requirement,
        body_limit: state.config.server.body_limit_bytes,
    };
    Router::new()
        .route(path, method_router)
        .route_layer(from_fn_with_state(guard, authorize))
}

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 登录（无需认证）
    let auth_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/admin/auth/login", post(handlers::auth::admin_login));

    // 可选认证
    let optional_routes = Router::new()
        .route("/api/public/session", get(handlers::auth::session))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .merge(guarded(
            &state,
            "/api/grower/farms/{farmId}",
            get(handlers::dashboard::grower_farm),
            Requirement::All(vec![Requirement::CoffeeGrower, Requirement::OwnFarm]),
        ))
        .merge(guarded(
            &state,
            "/api/admin/overview",
            get(handlers::dashboard::admin_overview),
            Requirement::RoleAtLeast(Role::Admin),
        ))
        .merge(guarded(
            &state,
            "/api/admin/reports",
            get(handlers::dashboard::admin_reports),
            Requirement::Permission("reports.read"),
        ))
        .merge(guarded(
            &state,
            "/api/admin/users",
            get(handlers::dashboard::admin_users),
            Requirement::RoleIn(USER_ADMIN_ROLES),
        ))
        .merge(guarded(
            &state,
            "/api/moderation/queue",
            get(handlers::dashboard::moderation_queue),
            Requirement::AnyPermission(MODERATION_PERMISSIONS),
        ))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let body_limit = state.config.server.body_limit_bytes;

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(optional_routes)
        .merge(authenticated_routes)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_tracking_middleware))
        .with_state(state)
}
