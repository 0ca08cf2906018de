//! In-memory record store.
//!
//! Mirrors the `PostgreSQL` constraints that matter to the authorization core:
//! case-insensitive unique emails and role names, unique permission names and
//! weak references between records. Used by tests and for running the server
//! without a database.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::models::{Admin, NewAdmin, NewUser, Permission, PrincipalKind, Role, User};
use super::store::{RecordStore, StoreError, StoreResult};

/// Record store held entirely in process memory.
#[derive(Default)]
pub struct MemoryRecordStore {
    admins: DashMap<Uuid, Admin>,
    users: DashMap<Uuid, User>,
    roles: DashMap<Uuid, Role>,
    permissions: DashMap<Uuid, Permission>,
    unavailable: AtomicBool,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert or replace an admin record as-is.
    pub fn insert_admin(&self, admin: Admin) {
        self.admins.insert(admin.id, admin);
    }

    /// Insert or replace a user record as-is.
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Insert or replace a permission record as-is.
    pub fn insert_permission(&self, permission: Permission) {
        self.permissions.insert(permission.id, permission);
    }

    /// Delete a permission, leaving any references to it dangling.
    pub fn remove_permission(&self, id: Uuid) -> bool {
        self.permissions.remove(&id).is_some()
    }

    /// Delete a role, leaving any references to it dangling.
    pub fn remove_role(&self, id: Uuid) -> bool {
        self.roles.remove(&id).is_some()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_admin_by_id(&self, id: Uuid) -> StoreResult<Option<Admin>> {
        self.check_available()?;
        Ok(self.admins.get(&id).map(|a| a.value().clone()))
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<Admin>> {
        self.check_available()?;
        Ok(self
            .admins
            .iter()
            .find(|a| same_email(&a.email, email))
            .map(|a| a.value().clone()))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_available()?;
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.check_available()?;
        Ok(self
            .users
            .iter()
            .find(|u| same_email(&u.email, email))
            .map(|u| u.value().clone()))
    }

    async fn find_role_by_id(&self, id: Uuid) -> StoreResult<Option<Role>> {
        self.check_available()?;
        Ok(self.roles.get(&id).map(|r| r.value().clone()))
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        self.check_available()?;
        Ok(self
            .roles
            .iter()
            .find(|r| r.name.trim().eq_ignore_ascii_case(name.trim()))
            .map(|r| r.value().clone()))
    }

    async fn find_permissions_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Permission>> {
        self.check_available()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.permissions.get(id).map(|p| p.value().clone()))
            .collect())
    }

    async fn find_permission_by_name(&self, name: &str) -> StoreResult<Option<Permission>> {
        self.check_available()?;
        Ok(self
            .permissions
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value().clone()))
    }

    async fn create_admin(&self, admin: NewAdmin) -> StoreResult<Admin> {
        self.check_available()?;
        if self.admins.iter().any(|a| same_email(&a.email, &admin.email)) {
            return Err(StoreError::Conflict("admins_email_lower_key".into()));
        }

        let now = Utc::now();
        let record = Admin {
            id: Uuid::now_v7(),
            email: admin.email,
            full_name: admin.full_name,
            password_hash: admin.password_hash,
            role: admin.role,
            role_id: admin.role_id,
            otp: None,
            otp_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        self.admins.insert(record.id, record.clone());
        Ok(record)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.check_available()?;
        if self.users.iter().any(|u| same_email(&u.email, &user.email)) {
            return Err(StoreError::Conflict("users_email_lower_key".into()));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::now_v7(),
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            is_active: true,
            role_id: user.role_id,
            permission_ids: user.permission_ids,
            otp: None,
            otp_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn create_role(&self, name: &str, permission_ids: &[Uuid]) -> StoreResult<Role> {
        self.check_available()?;
        if self
            .roles
            .iter()
            .any(|r| r.name.trim().eq_ignore_ascii_case(name.trim()))
        {
            return Err(StoreError::Conflict("roles_name_lower_key".into()));
        }

        let record = Role {
            id: Uuid::now_v7(),
            name: name.trim().to_string(),
            permission_ids: permission_ids.to_vec(),
            created_at: Utc::now(),
        };
        self.roles.insert(record.id, record.clone());
        Ok(record)
    }

    async fn create_permission(&self, name: &str) -> StoreResult<Permission> {
        self.check_available()?;
        if self.permissions.iter().any(|p| p.name == name) {
            return Err(StoreError::Conflict("permissions_name_key".into()));
        }

        let record = Permission {
            id: Uuid::now_v7(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.permissions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_role_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> StoreResult<bool> {
        self.check_available()?;
        let Some(mut role) = self.roles.get_mut(&id) else {
            return Ok(false);
        };
        role.permission_ids = permission_ids.to_vec();
        Ok(true)
    }

    async fn update_password(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        password_hash: &str,
    ) -> StoreResult<bool> {
        self.check_available()?;
        let now = Utc::now();
        let updated = match kind {
            PrincipalKind::Admin => self.admins.get_mut(&id).map(|mut a| {
                a.password_hash = password_hash.to_string();
                a.otp = None;
                a.otp_expires_at = None;
                a.updated_at = now;
            }),
            PrincipalKind::User => self.users.get_mut(&id).map(|mut u| {
                u.password_hash = password_hash.to_string();
                u.otp = None;
                u.otp_expires_at = None;
                u.updated_at = now;
            }),
        };
        Ok(updated.is_some())
    }

    async fn set_reset_code(
        &self,
        kind: PrincipalKind,
        id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.check_available()?;
        let now = Utc::now();
        let updated = match kind {
            PrincipalKind::Admin => self.admins.get_mut(&id).map(|mut a| {
                a.otp = Some(code.to_string());
                a.otp_expires_at = Some(expires_at);
                a.updated_at = now;
            }),
            PrincipalKind::User => self.users.get_mut(&id).map(|mut u| {
                u.otp = Some(code.to_string());
                u.otp_expires_at = Some(expires_at);
                u.updated_at = now;
            }),
        };
        Ok(updated.is_some())
    }
}
