//! Credential repository (MySQL)
//!
//! Each call takes exactly one pooled connection; the guard returns it to
//! the pool when dropped, on success and on every error path.

use crate::{
    db::{self, HealthStatus},
    error::AppError,
    models::credential::{AdminRecord, AdminSession, CredentialRecord, Farm, GrowerRecord},
    repository::credential_store::CredentialStore,
};
use async_trait::async_trait;
use sqlx::MySqlPool;

const CREDENTIAL_COLUMNS: &str = r#"
    u.id, u.email, u.password_hash, u.role, u.is_active,
    u.first_name, u.last_name, u.permissions,
    f.id AS farm_id, f.name AS farm_name
"#;

const ADMIN_COLUMNS: &str = r#"
    id, email, password_hash, role, is_active,
    first_name, last_name, permissions, locked_until
"#;

pub struct MySqlCredentialStore {
    db: MySqlPool,
}

impl MySqlCredentialStore {
    pub fn new(db: MySqlPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.db
    }
}

#[async_trait]
impl CredentialStore for MySqlCredentialStore {
    async fn find_active_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CredentialRecord>, AppError> {
        let mut conn = self.db.acquire().await?;

        let record = sqlx::query_as::<_, CredentialRecord>(&format!(
            r#"
            SELECT {CREDENTIAL_COLUMNS}
            FROM users u
            LEFT JOIN farms f ON f.user_id = u.id
            WHERE u.email = ? AND u.is_active = TRUE
            ORDER BY f.id
            LIMIT 1
            "#
        ))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(record)
    }

    async fn find_active_by_id(&self, id: i64) -> Result<Option<CredentialRecord>, AppError> {
        let mut conn = self.db.acquire().await?;

        let record = sqlx::query_as::<_, CredentialRecord>(&format!(
            r#"
            SELECT {CREDENTIAL_COLUMNS}
            FROM users u
            LEFT JOIN farms f ON f.user_id = u.id
            WHERE u.id = ? AND u.is_active = TRUE
            ORDER BY f.id
            LIMIT 1
            "#
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(record)
    }

    async fn find_active_grower_by_id(
        &self,
        id: i64,
    ) -> Result<Option<(GrowerRecord, Option<Farm>)>, AppError> {
        let mut conn = self.db.acquire().await?;

        let grower = sqlx::query_as::<_, GrowerRecord>(
            r#"
            SELECT id, email, role, is_active, email_verified,
                   first_name, last_name, permissions
            FROM users
            WHERE id = ? AND is_active = TRUE AND email_verified = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(grower) = grower else {
            return Ok(None);
        };

        let farm = sqlx::query_as::<_, Farm>(
            "SELECT id, name FROM farms WHERE user_id = ? ORDER BY id LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(Some((grower, farm)))
    }

    async fn find_active_admin_by_id(&self, id: i64) -> Result<Option<AdminRecord>, AppError> {
        let mut conn = self.db.acquire().await?;

        let admin = sqlx::query_as::<_, AdminRecord>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE id = ? AND is_active = TRUE"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(admin)
    }

    async fn find_active_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AdminRecord>, AppError> {
        let mut conn = self.db.acquire().await?;

        let admin = sqlx::query_as::<_, AdminRecord>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE email = ? AND is_active = TRUE"
        ))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(admin)
    }

    async fn find_active_sessions_with_hash(&self) -> Result<Vec<AdminSession>, AppError> {
        let mut conn = self.db.acquire().await?;

        let sessions = sqlx::query_as::<_, AdminSession>(
            r#"
            SELECT id, admin_id, token_hash, expires_at
            FROM admin_sessions
            WHERE is_active = TRUE AND expires_at > UTC_TIMESTAMP()
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(sessions)
    }

    async fn health_check(&self) -> HealthStatus {
        db::ping(&self.db).await
    }
}
