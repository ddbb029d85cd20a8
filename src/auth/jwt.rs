//! Signed structured tokens (HS256)
//!
//! Verification fails closed: without a configured secret no structured
//! token is ever accepted.

use crate::{
    auth::{permissions::PermissionSet, role::AccountKind, role::Role},
    config::AppConfig,
    error::AppError,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Token claims. Current tokens carry `{userId, role, permissions, kind}`;
/// older clients still present `{email, role}` or kind-less `{userId, role}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Raw role string, normalized by the verifier
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AccountKind>,

    /// Issued at
    #[serde(default)]
    pub iat: i64,

    /// Expiration
    pub exp: i64,
}

/// How the claims identify the account
#[derive(Debug, PartialEq, Eq)]
pub enum ClaimShape<'a> {
    ByEmail(&'a str),
    ById {
        user_id: i64,
        kind: Option<AccountKind>,
        role: &'a str,
    },
    Unidentified,
}

impl Claims {
    pub fn shape(&self) -> ClaimShape<'_> {
        if let Some(email) = self.email.as_deref() {
            return ClaimShape::ByEmail(email);
        }
        match self.user_id {
            Some(user_id) => ClaimShape::ById {
                user_id,
                kind: self.kind,
                role: &self.role,
            },
            None => ClaimShape::Unidentified,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("structured tokens are disabled: no signing secret configured")]
    NotConfigured,

    #[error("token expired")]
    Expired,

    #[error("token rejected: {0}")]
    Invalid(String),
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// JWT service
pub struct JwtService {
    keys: Option<Keys>,
    token_exp_secs: u64,
}

impl JwtService {
    pub fn new(secret: Option<&str>, token_exp_secs: u64) -> Result<Self, AppError> {
        let keys = match secret {
            Some(secret) => {
                // Ensure secret is at least 32 bytes for HS256
                if secret.len() < 32 {
                    return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
                }
                Some(Keys {
                    encoding: EncodingKey::from_secret(secret.as_bytes()),
                    decoding: DecodingKey::from_secret(secret.as_bytes()),
                })
            }
            None => {
                tracing::warn!("No JWT secret configured; structured tokens will be refused");
                None
            }
        };

        Ok(Self {
            keys,
            token_exp_secs,
        })
    }

    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let secret = config
            .security
            .jwt_secret
            .as_ref()
            .map(|s| s.expose_secret().as_str());

        Self::new(secret, config.security.token_exp_secs)
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    pub fn token_exp_secs(&self) -> u64 {
        self.token_exp_secs
    }

    /// Build claims for a freshly authenticated account
    pub fn claims_for(
        &self,
        user_id: i64,
        role: Role,
        permissions: &PermissionSet,
        kind: AccountKind,
    ) -> Claims {
        let now = Utc::now();
        let expiration = now + Duration::seconds(self.token_exp_secs as i64);

        Claims {
            user_id: Some(user_id),
            email: None,
            role: role.as_str().to_string(),
            permissions: (!permissions.is_empty()).then(|| permissions.to_vec()),
            kind: Some(kind),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        let keys = self
            .keys
            .as_ref()
            .ok_or_else(|| AppError::Config("JWT secret not configured".to_string()))?;

        encode(&Header::new(Algorithm::HS256), claims, &keys.encoding).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }

    /// Validate signature and expiry, then decode
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        let keys = self.keys.as_ref().ok_or(JwtError::NotConfigured)?;

        decode::<Claims>(token, &keys.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => {
                    tracing::debug!("Token validation failed: {:?}", e);
                    JwtError::Invalid(e.to_string())
                }
            })
    }
}
