//! Credential Store records (read-only to the auth core)

use chrono::{DateTime, Utc};
use sqlx::types::Json;

/// Grower/user account, optionally joined with the farm it owns
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRecord {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub permissions: Option<Json<Vec<String>>>,
    pub farm_id: Option<i64>,
    pub farm_name: Option<String>,
}

/// Grower account as loaded for structured-token resolution
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GrowerRecord {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub permissions: Option<Json<Vec<String>>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Farm {
    pub id: i64,
    pub name: String,
}

/// Back-office account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminRecord {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub permissions: Option<Json<Vec<String>>>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl AdminRecord {
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Stored admin session; `token_hash` is the hex SHA-256 of the session token
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminSession {
    pub id: i64,
    pub admin_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// "First Last", or whichever half exists
pub fn display_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let name = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!name.is_empty()).then_some(name)
}

pub fn permissions_of(column: &Option<Json<Vec<String>>>) -> Option<Vec<String>> {
    column.as_ref().map(|json| json.0.clone())
}
