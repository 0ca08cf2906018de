//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Platform administrator.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Legacy free-text role label, consulted when `role_id` resolves to nothing.
    pub role: Option<String>,
    pub role_id: Option<Uuid>,
    #[serde(skip_serializing)]
    pub otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Regular user account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub role_id: Option<Uuid>,
    /// Direct grants on top of the role's permissions.
    pub permission_ids: Vec<Uuid>,
    #[serde(skip_serializing)]
    pub otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named bundle of permissions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub permission_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Atomic capability, stored by name (`school:create`).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Which table a principal lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Admin,
    User,
}

impl PrincipalKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

/// Fields required to insert an admin.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Option<String>,
    pub role_id: Option<Uuid>,
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role_id: Option<Uuid>,
    pub permission_ids: Vec<Uuid>,
}

/// An authenticated actor, loaded from either table.
#[derive(Debug, Clone)]
pub enum Principal {
    Admin(Admin),
    User(User),
}

impl Principal {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::Admin(a) => a.id,
            Self::User(u) => u.id,
        }
    }

    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::Admin(a) => &a.email,
            Self::User(u) => &u.email,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> &str {
        match self {
            Self::Admin(a) => &a.full_name,
            Self::User(u) => &u.full_name,
        }
    }

    #[must_use]
    pub const fn role_id(&self) -> Option<Uuid> {
        match self {
            Self::Admin(a) => a.role_id,
            Self::User(u) => u.role_id,
        }
    }

    /// Legacy role label. Only admins carry one.
    #[must_use]
    pub fn role_label(&self) -> Option<&str> {
        match self {
            Self::Admin(a) => a.role.as_deref(),
            Self::User(_) => None,
        }
    }

    /// Direct permission grants. Only users carry them.
    #[must_use]
    pub fn direct_permission_ids(&self) -> Option<&[Uuid]> {
        match self {
            Self::Admin(_) => None,
            Self::User(u) => Some(&u.permission_ids),
        }
    }
}
