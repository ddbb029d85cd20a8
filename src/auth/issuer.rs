//! Token issuance at login time

use crate::{
    auth::{
        jwt::JwtService,
        legacy::{self, LegacyTokenPolicy},
        permissions::PermissionSet,
        role::{AccountKind, Role},
    },
    error::AppError,
};
use chrono::Utc;
use std::sync::Arc;

/// An account whose credentials were just verified
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub kind: AccountKind,
    pub permissions: PermissionSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFormat {
    Signed,
    LegacyGrower,
    LegacyUser,
}

impl TokenFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenFormat::Signed => "jwt",
            TokenFormat::LegacyGrower => "grower-token",
            TokenFormat::LegacyUser => "user-token",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub format: TokenFormat,
    /// Seconds until expiry; unsigned forms never expire on their own
    pub expires_in: Option<u64>,
}

/// Stateless; never writes to storage
pub struct TokenIssuer {
    jwt: Arc<JwtService>,
    legacy: LegacyTokenPolicy,
}

impl TokenIssuer {
    pub fn new(jwt: Arc<JwtService>, legacy: LegacyTokenPolicy) -> Self {
        Self { jwt, legacy }
    }

    /// Grower logins keep receiving `grower-token-<email>` while the legacy
    /// window is open; everything else gets a signed token.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, AppError> {
        let legacy_open = self.legacy.is_active();

        if identity.kind == AccountKind::Grower && identity.role.is_grower() && legacy_open {
            tracing::warn!(
                account_id = identity.id,
                sunset = %self.legacy.sunset,
                "Issuing deprecated grower-token for backward compatibility"
            );
            return Ok(IssuedToken {
                token: legacy::grower_token(&identity.email),
                format: TokenFormat::LegacyGrower,
                expires_in: None,
            });
        }

        if self.jwt.is_configured() {
            return self.issue_signed(identity);
        }

        if legacy_open {
            tracing::warn!(
                account_id = identity.id,
                "No signing secret configured; issuing deprecated user-token"
            );
            return Ok(IssuedToken {
                token: legacy::user_token(identity.id, Utc::now().timestamp_millis()),
                format: TokenFormat::LegacyUser,
                expires_in: None,
            });
        }

        Err(AppError::Config(
            "No token format available: configure security.jwt_secret".to_string(),
        ))
    }

    /// Signed token only; back-office logins never fall back to legacy forms
    pub fn issue_signed(&self, identity: &Identity) -> Result<IssuedToken, AppError> {
        let claims = self.jwt.claims_for(
            identity.id,
            identity.role,
            &identity.permissions,
            identity.kind,
        );
        let token = self.jwt.encode(&claims)?;

        Ok(IssuedToken {
            token,
            format: TokenFormat::Signed,
            expires_in: Some(self.jwt.token_exp_secs()),
        })
    }
}
