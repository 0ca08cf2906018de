//! Record Store
//!
//! Abstract access to principals, roles and permissions. The authorization
//! core only ever talks to `dyn RecordStore`; `PgRecordStore` is the
//! production implementation and `MemoryRecordStore` backs tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Admin, NewAdmin, NewUser, Permission, PrincipalKind, Role, User};
use super::queries;

/// Record store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("{0} already exists")]
    Conflict(String),

    /// The store could not be reached.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// Database error.
    #[error("Database error")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(db_err.constraint().unwrap_or("record").to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Database(err),
        }
    }
}

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Id-based lookup and update operations over the persistent records.
///
/// Role and permission references are weak: a lookup through a dangling id
/// yields `None` (or a shorter `Vec`) rather than an error.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_admin_by_id(&self, id: Uuid) -> StoreResult<Option<Admin>>;
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_role_by_id(&self, id: Uuid) -> StoreResult<Option<Role>>;
    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    /// Populate permission references. Missing ids are skipped.
    async fn find_permissions_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Permission>>;
    async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>>;

    async fn create_admin(&self, admin: NewAdmin) -> StoreResult<Admin>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn create_role(&self, name: &str, permission_ids: &[Uuid]) -> StoreResult<Role>;
    async fn create_permission(&self, name: &str) -> StoreResult<Permission>;
    async fn set_role_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> StoreResult<bool>;

    /// Replace the password hash and clear any pending reset code.
    async fn update_password(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        password_hash: &str,
    ) -> StoreResult<bool>;

    async fn set_reset_code(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool>;
}

/// `PostgreSQL`-backed record store.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_admin_by_id(&self, id: Uuid) -> StoreResult<Option<Admin>> {
        Ok(queries::find_admin_by_id(&self.pool, id).await?)
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        Ok(queries::find_admin_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(queries::find_user_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(queries::find_user_by_email(&self.pool, email).await?)
    }

    async fn find_role_by_id(&self, id: Uuid) -> StoreResult<Option<Role>> {
        Ok(queries::find_role_by_id(&self.pool, id).await?)
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        Ok(queries::find_role_by_name(&self.pool, name).await?)
    }

    async fn find_permissions_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Permission>> {
        Ok(queries::find_permissions_by_ids(&self.pool, ids).await?)
    }

    async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>> {
        Ok(queries::find_permission_by_name(&self.pool, name).await?)
    }

    async fn create_admin(&self, admin: NewAdmin) -> StoreResult<Admin> {
        Ok(queries::create_admin(&self.pool, &admin).await?)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        Ok(queries::create_user(&self.pool, &user).await?)
    }

    async fn create_role(&self, name: &str, permission_ids: &[Uuid]) -> StoreResult<Role> {
        Ok(queries::create_role(&self.pool, name, permission_ids).await?)
    }

    async fn create_permission(&self, name: &str) -> StoreResult<Permission> {
        Ok(queries::create_permission(&self.pool, name).await?)
    }

    async fn set_role_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> StoreResult<bool> {
        Ok(queries::set_role_permissions(&self.pool, id, permission_ids).await?)
    }

    async fn update_password(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        password_hash: &str,
    ) -> StoreResult<bool> {
        Ok(queries::update_password(&self.pool, kind, id, password_hash).await?)
    }

    async fn set_reset_code(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(queries::set_reset_code(&self.pool, kind, id, code, expires_at).await?)
    }
}
