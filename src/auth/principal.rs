//! The authenticated caller attached to a request

use crate::{
    auth::{permissions::PermissionSet, role::AccountKind, role::Role},
    error::AppError,
    models::credential::{
        display_name, permissions_of, AdminRecord, CredentialRecord, Farm, GrowerRecord,
    },
};
use axum::extract::FromRequestParts;
use serde::Serialize;
use std::convert::Infallible;

/// Authenticated caller for the lifetime of one request. Only the token
/// verifier builds one; it is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub kind: AccountKind,
    pub permissions: PermissionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resolved from an unsigned `grower-token-` credential
    pub is_demo: bool,
}

pub const DEV_SUPER_ADMIN_ID: i64 = 0;
pub const DEV_SUPER_ADMIN_EMAIL: &str = "superadmin@cafecolombia.local";

fn parse_role(raw: &str, account_id: i64) -> Result<Role, AppError> {
    raw.parse::<Role>().map_err(|e| {
        tracing::warn!(account_id, role = %raw, "Account carries an unknown role");
        AppError::InvalidToken(e.to_string())
    })
}

impl Principal {
    /// From a users-table row (email or embedded-id lookups). The kind is
    /// always `Grower`: it names the table, not the role.
    pub fn from_credential(record: CredentialRecord, is_demo: bool) -> Result<Self, AppError> {
        if !record.is_active {
            return Err(AppError::invalid_token("account is inactive"));
        }
        let role = parse_role(&record.role, record.id)?;

        Ok(Self {
            id: record.id,
            name: display_name(record.first_name.as_deref(), record.last_name.as_deref()),
            permissions: permissions_of(&record.permissions).into(),
            kind: AccountKind::Grower,
            role,
            email: record.email,
            farm_id: record.farm_id,
            farm_name: record.farm_name,
            is_demo,
        })
    }

    /// From a verified grower and the farm it owns
    pub fn from_grower(record: GrowerRecord, farm: Option<Farm>) -> Result<Self, AppError> {
        if !record.is_active {
            return Err(AppError::invalid_token("grower account is inactive"));
        }
        if !record.email_verified {
            return Err(AppError::invalid_token("grower email is not verified"));
        }
        let role = parse_role(&record.role, record.id)?;
        if !role.is_grower() {
            return Err(AppError::invalid_token("grower table row carries a back-office role"));
        }

        Ok(Self {
            id: record.id,
            name: display_name(record.first_name.as_deref(), record.last_name.as_deref()),
            permissions: permissions_of(&record.permissions).into(),
            role,
            kind: AccountKind::Grower,
            email: record.email,
            farm_id: farm.as_ref().map(|f| f.id),
            farm_name: farm.map(|f| f.name),
            is_demo: false,
        })
    }

    /// From a back-office row; `kind` is `Admin` or `Service`
    pub fn from_admin(record: AdminRecord, kind: AccountKind) -> Result<Self, AppError> {
        if !record.is_active {
            return Err(AppError::invalid_token("admin account is inactive"));
        }
        let role = parse_role(&record.role, record.id)?;
        if role.is_grower() {
            return Err(AppError::invalid_token("admin table row carries a grower role"));
        }

        Ok(Self {
            id: record.id,
            name: display_name(record.first_name.as_deref(), record.last_name.as_deref()),
            permissions: permissions_of(&record.permissions).into(),
            role,
            kind,
            email: record.email,
            farm_id: None,
            farm_name: None,
            is_demo: false,
        })
    }

    /// Built-in super admin for development setups without admin sessions
    pub fn dev_super_admin() -> Self {
        Self {
            id: DEV_SUPER_ADMIN_ID,
            email: DEV_SUPER_ADMIN_EMAIL.to_string(),
            role: Role::SuperAdmin,
            kind: AccountKind::Admin,
            permissions: PermissionSet::wildcard(),
            farm_id: None,
            farm_name: None,
            name: Some("Super Admin".to_string()),
            is_demo: false,
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::AuthenticationRequired)
    }
}

/// Principal if one was attached; never rejects
#[derive(Debug, Clone)]
pub struct OptionalPrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for OptionalPrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalPrincipal(parts.extensions.get::<Principal>().cloned()))
    }
}
