//! 认证服务：种植者登录、后台管理员登录

use crate::{
    auth::{
        issuer::{Identity, IssuedToken, TokenIssuer},
        password::PasswordHasher,
        principal::Principal,
        role::AccountKind,
    },
    error::AppError,
    models::auth::{LoginRequest, LoginResponse},
    repository::CredentialStore,
};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: Arc<TokenIssuer>,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            store,
            issuer,
            hasher,
        }
    }

    /// 种植者/普通用户登录
    pub async fn login_grower(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        req.validate()?;

        let record = self
            .store
            .find_active_by_email(&req.email)
            .await?
            .ok_or_else(|| {
                tracing::info!("Login failed: unknown or inactive account");
                AppError::InvalidCredentials
            })?;

        // 验证密码
        self.hasher.verify(&req.password, &record.password_hash)?;

        let principal = Principal::from_credential(record, false)
            .map_err(|_| AppError::InvalidCredentials)?;

        let issued = self.issuer.issue(&Identity {
            id: principal.id,
            email: principal.email.clone(),
            role: principal.role,
            kind: AccountKind::Grower,
            permissions: principal.permissions.clone(),
        })?;

        tracing::info!(
            account_id = principal.id,
            token_type = issued.format.as_str(),
            "Grower login succeeded"
        );
        metrics::counter!("auth_logins_total", "kind" => "grower").increment(1);

        Ok(Self::respond(issued, principal))
    }

    /// 后台管理员登录（始终签发 JWT）
    pub async fn login_admin(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        req.validate()?;

        let admin = self
            .store
            .find_active_admin_by_email(&req.email)
            .await?
            .ok_or_else(|| {
                tracing::info!("Admin login failed: unknown or inactive account");
                AppError::InvalidCredentials
            })?;

        // 检查账户是否被锁定
        if admin.is_locked(Utc::now()) {
            tracing::warn!(account_id = admin.id, "Admin login refused: account locked");
            return Err(AppError::AccountLocked);
        }

        self.hasher.verify(&req.password, &admin.password_hash)?;

        let principal = Principal::from_admin(admin, AccountKind::Admin)
            .map_err(|_| AppError::InvalidCredentials)?;

        let issued = self.issuer.issue_signed(&Identity {
            id: principal.id,
            email: principal.email.clone(),
            role: principal.role,
            kind: AccountKind::Admin,
            permissions: principal.permissions.clone(),
        })?;

        tracing::info!(
            account_id = principal.id,
            role = %principal.role,
            "Admin login succeeded"
        );
        metrics::counter!("auth_logins_total", "kind" => "admin").increment(1);

        Ok(Self::respond(issued, principal))
    }

    fn respond(issued: IssuedToken, principal: Principal) -> LoginResponse {
        LoginResponse {
            success: true,
            token: issued.token,
            token_type: issued.format.as_str().to_string(),
            expires_in: issued.expires_in,
            user: principal,
        }
    }
}
