//! Bootstrap data.
//!
//! Creates the permission catalog, a `SUPER_ADMIN` role holding all of it and
//! the first super admin. Safe to run repeatedly.

use anyhow::{Context, Result};
use sg_common::{Permission as CatalogPermission, RoleName};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, PasswordPolicy};
use crate::db::{NewAdmin, RecordStore, Role, StoreError};

/// Full name given to the seeded super admin.
pub const SEED_ADMIN_NAME: &str = "Super Admin";

/// What a seed run changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub role_created: bool,
    pub admin_created: bool,
}

/// Ensure every catalog permission exists. Returns their ids.
async fn ensure_permissions(records: &dyn RecordStore, report: &mut SeedReport) -> Result<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(CatalogPermission::all().len());

    for permission in CatalogPermission::all() {
        let name = permission.as_str();
        let existing = records.find_permission_by_name(name).await?;
        let record = match existing {
            Some(record) => record,
            None => match records.create_permission(name).await {
                Ok(record) => {
                    report.permissions_created += 1;
                    record
                }
                Err(StoreError::Conflict(_)) => records
                    .find_permission_by_name(name)
                    .await?
                    .with_context(|| format!("permission {name} vanished after conflict"))?,
                Err(e) => return Err(e.into()),
            },
        };
        ids.push(record.id);
    }

    Ok(ids)
}

/// Ensure the `SUPER_ADMIN` role exists and holds exactly `permission_ids`.
async fn ensure_super_admin_role(
    records: &dyn RecordStore,
    permission_ids: &[Uuid],
    report: &mut SeedReport,
) -> Result<Role> {
    let name = RoleName::SuperAdmin.as_str();

    if let Some(mut role) = records.find_role_by_name(name).await? {
        records.set_role_permissions(role.id, permission_ids).await?;
        role.permission_ids = permission_ids.to_vec();
        return Ok(role);
    }

    let role = records.create_role(name, permission_ids).await?;
    report.role_created = true;
    Ok(role)
}

/// Seed permissions, the super admin role and the first super admin.
pub async fn seed_super_admin(
    records: &dyn RecordStore,
    email: &str,
    password: &str,
    password_policy: PasswordPolicy,
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let permission_ids = ensure_permissions(records, &mut report).await?;
    let role = ensure_super_admin_role(records, &permission_ids, &mut report).await?;

    if records.find_admin_by_email(email).await?.is_some() {
        info!(email = %email, "Super admin already exists");
        return Ok(report);
    }

    password_policy
        .validate(password)
        .context("DEFAULT_PASSWORD does not satisfy the password policy")?;
    let password_hash = hash_password(password).await?;

    let admin = records
        .create_admin(NewAdmin {
            email: email.trim().to_string(),
            full_name: SEED_ADMIN_NAME.to_string(),
            password_hash,
            role: Some(role.name.clone()),
            role_id: Some(role.id),
        })
        .await?;
    report.admin_created = true;

    info!(admin_id = %admin.id, "Super admin created");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::db::MemoryRecordStore;
    use crate::permissions::resolve_permissions;

    #[tokio::test]
    async fn test_seed_creates_everything_once() {
        let store = MemoryRecordStore::new();
        let policy = PasswordPolicy::new(8);

        let first = seed_super_admin(&store, "root@school.test", "Secret123", policy)
            .await
            .unwrap();
        assert_eq!(first.permissions_created, CatalogPermission::all().len());
        assert!(first.role_created);
        assert!(first.admin_created);

        let second = seed_super_admin(&store, "root@school.test", "Secret123", policy)
            .await
            .unwrap();
        assert_eq!(second, SeedReport::default());

        let admin = store
            .find_admin_by_email("root@school.test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role.as_deref(), Some("SUPER_ADMIN"));
        assert!(verify_password("Secret123", &admin.password_hash).await.unwrap());

        let granted = resolve_permissions(&store, admin.id).await.unwrap();
        assert_eq!(granted.len(), CatalogPermission::all().len());
        assert!(granted.contains("admin:create"));
    }

    #[tokio::test]
    async fn test_seed_rejects_weak_password() {
        let store = MemoryRecordStore::new();
        let result =
            seed_super_admin(&store, "root@school.test", "weak", PasswordPolicy::new(8)).await;
        assert!(result.is_err());
        assert!(store
            .find_admin_by_email("root@school.test")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_seed_restores_role_permissions() {
        let store = MemoryRecordStore::new();
        let role = store.create_role("super_admin", &[]).await.unwrap();

        let report = seed_super_admin(&store, "root@school.test", "Secret123", PasswordPolicy::new(8))
            .await
            .unwrap();
        assert!(!report.role_created);

        let role = store.find_role_by_id(role.id).await.unwrap().unwrap();
        assert_eq!(role.permission_ids.len(), CatalogPermission::all().len());
    }
}
