//! Credential Store contract
//!
//! Every lookup treats inactive or absent records as "not found". Storage
//! failures surface as `Err`, never as `Ok(None)`.

use crate::{
    db::HealthStatus,
    error::AppError,
    models::credential::{AdminRecord, AdminSession, CredentialRecord, Farm, GrowerRecord},
};
use async_trait::async_trait;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Active grower/user account by email, with its farm if it owns one
    async fn find_active_by_email(&self, email: &str)
        -> Result<Option<CredentialRecord>, AppError>;

    /// Active grower/user account by id, with its farm if it owns one
    async fn find_active_by_id(&self, id: i64) -> Result<Option<CredentialRecord>, AppError>;

    /// Active, email-verified grower and the farm it owns
    async fn find_active_grower_by_id(
        &self,
        id: i64,
    ) -> Result<Option<(GrowerRecord, Option<Farm>)>, AppError>;

    async fn find_active_admin_by_id(&self, id: i64) -> Result<Option<AdminRecord>, AppError>;

    async fn find_active_admin_by_email(&self, email: &str)
        -> Result<Option<AdminRecord>, AppError>;

    /// Active, unexpired admin sessions
    async fn find_active_sessions_with_hash(&self) -> Result<Vec<AdminSession>, AppError>;

    async fn health_check(&self) -> HealthStatus;
}
