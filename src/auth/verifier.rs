//! Bearer token verification
//!
//! Resolution order, first match wins:
//! 1. header must be exactly `Bearer <token>`
//! 2. signed structured token (claims by email, or by userId + kind/role)
//! 3. `grower-token-<email>`
//! 4. `user-token-<id>-<ts>`
//! 5. `admin-token-<ts>` against stored admin sessions
//!
//! Storage failures map to `InternalAuth` (500) and are never reported as a
//! credential problem.

use crate::{
    auth::{
        jwt::{ClaimShape, Claims, JwtError, JwtService},
        legacy::{constant_time_eq, hash_session_token, LegacyToken, LegacyTokenPolicy},
        principal::Principal,
        role::{AccountKind, Role},
    },
    error::AppError,
    repository::CredentialStore,
};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use std::sync::Arc;

/// Extract the token from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AppError> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty() && !token.chars().any(char::is_whitespace))
        .ok_or(AppError::AuthenticationRequired)
}

pub struct TokenVerifier {
    store: Arc<dyn CredentialStore>,
    jwt: Arc<JwtService>,
    legacy: LegacyTokenPolicy,
    dev_admin_stub: bool,
}

impl TokenVerifier {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        jwt: Arc<JwtService>,
        legacy: LegacyTokenPolicy,
        dev_admin_stub: bool,
    ) -> Self {
        if dev_admin_stub {
            tracing::warn!("admin-token resolves to the built-in super admin; development only");
        }

        Self {
            store,
            jwt,
            legacy,
            dev_admin_stub,
        }
    }

    /// Resolve the `Authorization` header to exactly one principal
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Principal, AppError> {
        let result = match bearer_token(header) {
            Ok(token) => self.resolve(token).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            metrics::counter!("auth_failures_total", "reason" => e.error_code()).increment(1);
        }
        result
    }

    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Principal, AppError> {
        let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        self.authenticate(header).await
    }

    /// Like `authenticate_headers`, but any failure yields `None`
    pub async fn try_authenticate_headers(&self, headers: &HeaderMap) -> Option<Principal> {
        match self.authenticate_headers(headers).await {
            Ok(principal) => Some(principal),
            Err(e) => {
                tracing::debug!(reason = %e, "Optional authentication skipped");
                None
            }
        }
    }

    /// Resolve a raw token (no `Bearer ` prefix)
    pub async fn resolve(&self, token: &str) -> Result<Principal, AppError> {
        match self.jwt.decode(token) {
            Ok(claims) => return self.resolve_claims(&claims).await,
            Err(JwtError::Expired) => return Err(AppError::TokenExpired),
            Err(JwtError::NotConfigured) => {
                tracing::debug!("Structured token verification refused: no signing secret");
            }
            Err(JwtError::Invalid(reason)) => {
                tracing::debug!(%reason, "Not a valid structured token, trying legacy formats");
            }
        }

        let legacy = LegacyToken::parse(token)
            .ok_or_else(|| AppError::invalid_token("unrecognised token format"))?;
        self.legacy.admit(&legacy)?;

        match legacy {
            LegacyToken::Grower { email } => self.resolve_grower_token(email).await,
            LegacyToken::User { user_id, .. } => self.resolve_user_token(user_id).await,
            LegacyToken::Admin { raw } => self.resolve_admin_token(raw).await,
        }
    }

    async fn resolve_claims(&self, claims: &Claims) -> Result<Principal, AppError> {
        let principal = match claims.shape() {
            ClaimShape::ByEmail(email) => {
                let record = self
                    .store
                    .find_active_by_email(email)
                    .await
                    .map_err(|e| self.storage_failure("find_active_by_email", e))?
                    .ok_or_else(|| AppError::invalid_token("no active account for token email"))?;
                Principal::from_credential(record, false)?
            }
            ClaimShape::ById {
                user_id,
                kind,
                role,
            } => {
                let kind = match kind {
                    Some(kind) => kind,
                    None => role
                        .parse::<Role>()
                        .map_err(|e| AppError::InvalidToken(e.to_string()))?
                        .account_kind(),
                };
                self.resolve_account(user_id, kind, role).await?
            }
            ClaimShape::Unidentified => {
                return Err(AppError::invalid_token("claims carry neither userId nor email"));
            }
        };

        if claims.role.parse::<Role>().ok() != Some(principal.role) {
            tracing::debug!(
                account_id = principal.id,
                token_role = %claims.role,
                stored_role = %principal.role,
                "Token role differs from stored role; using stored role"
            );
        }

        Ok(principal)
    }

    /// Look up the account in the table named by `kind`
    async fn resolve_account(
        &self,
        id: i64,
        kind: AccountKind,
        role: &str,
    ) -> Result<Principal, AppError> {
        if kind.uses_admin_table() {
            let admin = self
                .store
                .find_active_admin_by_id(id)
                .await
                .map_err(|e| self.storage_failure("find_active_admin_by_id", e))?
                .ok_or_else(|| AppError::invalid_token("no active admin for token"))?;
            return Principal::from_admin(admin, kind);
        }

        // Users-table staff have no grower row or farm
        let declared = role
            .parse::<Role>()
            .map_err(|e| AppError::InvalidToken(e.to_string()))?;
        if declared.is_back_office() {
            let record = self
                .store
                .find_active_by_id(id)
                .await
                .map_err(|e| self.storage_failure("find_active_by_id", e))?
                .ok_or_else(|| AppError::invalid_token("no active account for token"))?;
            return Principal::from_credential(record, false);
        }

        let (grower, farm) = self
            .store
            .find_active_grower_by_id(id)
            .await
            .map_err(|e| self.storage_failure("find_active_grower_by_id", e))?
            .ok_or_else(|| AppError::invalid_token("no active grower for token"))?;
        Principal::from_grower(grower, farm)
    }

    async fn resolve_grower_token(&self, email: &str) -> Result<Principal, AppError> {
        if email.is_empty() {
            return Err(AppError::invalid_token("grower-token carries no email"));
        }

        let record = self
            .store
            .find_active_by_email(email)
            .await
            .map_err(|e| self.storage_failure("find_active_by_email", e))?
            .ok_or_else(|| AppError::invalid_token("no active account for grower-token"))?;

        Principal::from_credential(record, true)
    }

    async fn resolve_user_token(&self, user_id: Option<i64>) -> Result<Principal, AppError> {
        let user_id =
            user_id.ok_or_else(|| AppError::invalid_token("user-token carries no numeric id"))?;

        let record = self
            .store
            .find_active_by_id(user_id)
            .await
            .map_err(|e| self.storage_failure("find_active_by_id", e))?
            .ok_or_else(|| AppError::invalid_token("no active account for user-token"))?;

        Principal::from_credential(record, false)
    }

    async fn resolve_admin_token(&self, raw: &str) -> Result<Principal, AppError> {
        if self.dev_admin_stub {
            tracing::warn!("admin-token resolved to the built-in super admin");
            return Ok(Principal::dev_super_admin());
        }

        let presented = hash_session_token(raw);
        let sessions = self
            .store
            .find_active_sessions_with_hash()
            .await
            .map_err(|e| self.storage_failure("find_active_sessions_with_hash", e))?;

        let now = Utc::now();
        let session = sessions
            .iter()
            .filter(|session| session.expires_at > now)
            .find(|session| constant_time_eq(&session.token_hash.to_ascii_lowercase(), &presented))
            .ok_or_else(|| AppError::invalid_token("no active admin session matches"))?;

        tracing::debug!(session_id = session.id, admin_id = session.admin_id, "Admin session matched");

        let admin = self
            .store
            .find_active_admin_by_id(session.admin_id)
            .await
            .map_err(|e| self.storage_failure("find_active_admin_by_id", e))?
            .ok_or_else(|| AppError::invalid_token("admin session owner is inactive"))?;

        Principal::from_admin(admin, AccountKind::Admin)
    }

    fn storage_failure(&self, lookup: &'static str, error: AppError) -> AppError {
        tracing::error!(lookup, error = %error, "Credential lookup failed during authentication");
        metrics::counter!("auth_storage_failures_total", "lookup" => lookup).increment(1);
        AppError::InternalAuth(format!("{} failed: {}", lookup, error))
    }
}
