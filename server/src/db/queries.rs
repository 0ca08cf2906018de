//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::models::{Admin, NewAdmin, NewUser, Permission, PrincipalKind, Role, User};

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

const fn principal_table(kind: PrincipalKind) -> &'static str {
    match kind {
        PrincipalKind::Admin => "admins",
        PrincipalKind::User => "users",
    }
}

// ============================================================================
// Admin Queries
// ============================================================================

/// Find admin by ID.
pub async fn find_admin_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Admin>> {
    sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_admin_by_id", admin_id = %id))
}

/// Find admin by email (case-insensitive).
pub async fn find_admin_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<Admin>> {
    sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE lower(email) = lower($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_admin_by_email", email = %email))
}

/// Create a new admin.
pub async fn create_admin(pool: &PgPool, admin: &NewAdmin) -> sqlx::Result<Admin> {
    sqlx::query_as::<_, Admin>(
        r"
        INSERT INTO admins (id, email, full_name, password_hash, role, role_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(&admin.email)
    .bind(&admin.full_name)
    .bind(&admin.password_hash)
    .bind(&admin.role)
    .bind(admin.role_id)
    .fetch_one(pool)
    .await
}

// ============================================================================
// User Queries
// ============================================================================

/// Find user by ID.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_id", user_id = %id))
}

/// Find user by email (case-insensitive).
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_email", email = %email))
}

/// Create a new user.
pub async fn create_user(pool: &PgPool, user: &NewUser) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (id, email, full_name, password_hash, role_id, permission_ids)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(&user.email)
    .bind(&user.full_name)
    .bind(&user.password_hash)
    .bind(user.role_id)
    .bind(&user.permission_ids)
    .fetch_one(pool)
    .await
}

// ============================================================================
// Credential Queries
// ============================================================================

/// Replace a principal's password hash and clear any pending reset code.
///
/// Returns `false` if no row matched.
pub async fn update_password(
    pool: &PgPool,
    kind: PrincipalKind,
    id: Uuid,
    password_hash: &str,
) -> sqlx::Result<bool> {
    let sql = format!(
        "UPDATE {} SET password_hash = $1, otp = NULL, otp_expires_at = NULL, updated_at = NOW() WHERE id = $2",
        principal_table(kind)
    );

    let result = sqlx::query(&sql)
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await
        .map_err(db_error!("update_password", kind = kind.as_str(), principal_id = %id))?;

    Ok(result.rows_affected() > 0)
}

/// Store a one-time reset code with its expiry.
pub async fn set_reset_code(
    pool: &PgPool,
    kind: PrincipalKind,
    id: Uuid,
    code: &str,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<bool> {
    let sql = format!(
        "UPDATE {} SET otp = $1, otp_expires_at = $2, updated_at = NOW() WHERE id = $3",
        principal_table(kind)
    );

    let result = sqlx::query(&sql)
        .bind(code)
        .bind(expires_at)
        .bind(id)
        .execute(pool)
        .await
        .map_err(db_error!("set_reset_code", kind = kind.as_str(), principal_id = %id))?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Role Queries
// ============================================================================

/// Find role by ID.
pub async fn find_role_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Role>> {
    sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_role_by_id", role_id = %id))
}

/// Find role by name (case-insensitive).
pub async fn find_role_by_name(pool: &PgPool, name: &str) -> sqlx::Result<Option<Role>> {
    sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE lower(name) = lower($1)")
        .bind(name.trim())
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_role_by_name", name = %name))
}

/// Create a role.
pub async fn create_role(pool: &PgPool, name: &str, permission_ids: &[Uuid]) -> sqlx::Result<Role> {
    sqlx::query_as::<_, Role>(
        "INSERT INTO roles (id, name, permission_ids) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(name.trim())
    .bind(permission_ids)
    .fetch_one(pool)
    .await
}

/// Replace a role's permission set.
pub async fn set_role_permissions(
    pool: &PgPool,
    id: Uuid,
    permission_ids: &[Uuid],
) -> sqlx::Result<bool> {
    let result = sqlx::query("UPDATE roles SET permission_ids = $1 WHERE id = $2")
        .bind(permission_ids)
        .bind(id)
        .execute(pool)
        .await
        .map_err(db_error!("set_role_permissions", role_id = %id))?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Permission Queries
// ============================================================================

/// Fetch the permissions that still exist among `ids`.
///
/// Dangling IDs are silently skipped.
pub async fn find_permissions_by_ids(pool: &PgPool, ids: &[Uuid]) -> sqlx::Result<Vec<Permission>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(db_error!("find_permissions_by_ids", count = ids.len()))
}

/// Find permission by exact name.
pub async fn find_permission_by_name(
    pool: &PgPool,
    name: &str,
) -> sqlx::Result<Option<Permission>> {
    sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_permission_by_name", name = %name))
}

/// Create a permission.
pub async fn create_permission(pool: &PgPool, name: &str) -> sqlx::Result<Permission> {
    sqlx::query_as::<_, Permission>(
        "INSERT INTO permissions (id, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(name)
    .fetch_one(pool)
    .await
}
