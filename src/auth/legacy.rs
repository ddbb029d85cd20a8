//! Unsigned, convention-prefixed tokens kept for older clients
//!
//! Token prefixes:
//! - `grower-token-<email>` : trusted by convention, resolves by email
//! - `user-token-<id>-<ts>` : resolves by the embedded account id
//! - `admin-token-<ts>`     : checked against stored admin session hashes
//!
//! Anyone who knows the convention can mint these, so they are only accepted
//! until the configured sunset date and every use is logged.

use crate::{config::SecurityConfig, error::AppError};
use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};

pub const GROWER_TOKEN_PREFIX: &str = "grower-token-";
pub const USER_TOKEN_PREFIX: &str = "user-token-";
pub const ADMIN_TOKEN_PREFIX: &str = "admin-token-";

/// A recognised legacy token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyToken<'a> {
    Grower { email: &'a str },
    /// `user_id` is `None` when the embedded id is not a number
    User {
        user_id: Option<i64>,
        issued_at: Option<i64>,
    },
    Admin { raw: &'a str },
}

impl<'a> LegacyToken<'a> {
    pub fn parse(token: &'a str) -> Option<Self> {
        if let Some(email) = token.strip_prefix(GROWER_TOKEN_PREFIX) {
            return Some(LegacyToken::Grower { email });
        }

        if let Some(rest) = token.strip_prefix(USER_TOKEN_PREFIX) {
            let (id, ts) = match rest.split_once('-') {
                Some((id, ts)) => (id, Some(ts)),
                None => (rest, None),
            };
            return Some(LegacyToken::User {
                user_id: id.parse().ok(),
                issued_at: ts.and_then(|ts| ts.parse().ok()),
            });
        }

        if token.starts_with(ADMIN_TOKEN_PREFIX) {
            return Some(LegacyToken::Admin { raw: token });
        }

        None
    }

    pub fn format_name(&self) -> &'static str {
        match self {
            LegacyToken::Grower { .. } => "grower-token",
            LegacyToken::User { .. } => "user-token",
            LegacyToken::Admin { .. } => "admin-token",
        }
    }
}

pub fn grower_token(email: &str) -> String {
    format!("{}{}", GROWER_TOKEN_PREFIX, email)
}

pub fn user_token(user_id: i64, issued_at_millis: i64) -> String {
    format!("{}{}-{}", USER_TOKEN_PREFIX, user_id, issued_at_millis)
}

/// Hex SHA-256 of a session token, as stored in `admin_sessions.token_hash`
pub fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Comparison whose running time does not depend on where the inputs differ
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Migration window for legacy tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyTokenPolicy {
    pub enabled: bool,
    pub sunset: NaiveDate,
}

impl LegacyTokenPolicy {
    pub fn from_config(security: &SecurityConfig) -> Result<Self, AppError> {
        Ok(Self {
            enabled: security.legacy_tokens_enabled,
            sunset: security.legacy_sunset_date()?,
        })
    }

    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.enabled && date <= self.sunset
    }

    pub fn is_active(&self) -> bool {
        self.is_active_on(Utc::now().date_naive())
    }

    /// Gate a presented legacy token. Accepted tokens are logged as deprecated.
    pub fn admit(&self, token: &LegacyToken<'_>) -> Result<(), AppError> {
        let format = token.format_name();

        if !self.is_active() {
            tracing::warn!(format, sunset = %self.sunset, "Rejected retired legacy token");
            return Err(AppError::invalid_token("legacy token formats are retired"));
        }

        metrics::counter!("auth_legacy_tokens_total", "format" => format).increment(1);
        tracing::warn!(
            format,
            sunset = %self.sunset,
            "Deprecated legacy token accepted; clients must move to signed tokens"
        );
        Ok(())
    }
}
