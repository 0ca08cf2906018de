//! Permission resolution.
//!
//! Computes the effective permission names of a principal from its role and,
//! for users, its direct grants.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::db::{Principal, RecordStore, StoreResult};

/// Load a principal by id. Users shadow admins with the same id.
pub async fn load_principal(records: &dyn RecordStore, id: Uuid) -> StoreResult<Option<Principal>> {
    if let Some(user) = records.find_user_by_id(id).await? {
        return Ok(Some(Principal::User(user)));
    }
    Ok(records.find_admin_by_id(id).await?.map(Principal::Admin))
}

/// Compute the permission names held by a principal.
///
/// Resolution order:
/// 1. User: role permissions plus direct grants. A found user never falls
///    through to the admin table, even with no permissions.
/// 2. Admin: role permissions only. Direct grants are not consulted.
/// 3. Unknown id: empty set.
///
/// Dangling role or permission references contribute nothing. Permissions
/// with blank names are dropped.
#[tracing::instrument(skip(records))]
pub async fn resolve_permissions(
    records: &dyn RecordStore,
    principal_id: Uuid,
) -> StoreResult<BTreeSet<String>> {
    let Some(principal) = load_principal(records, principal_id).await? else {
        return Ok(BTreeSet::new());
    };
    permissions_for(records, &principal).await
}

/// Compute the permission names held by an already loaded principal.
pub async fn permissions_for(
    records: &dyn RecordStore,
    principal: &Principal,
) -> StoreResult<BTreeSet<String>> {
    let mut ids = role_permission_ids(records, principal.role_id()).await?;
    if let Principal::User(user) = principal {
        ids.extend_from_slice(&user.permission_ids);
    }
    permission_names(records, &ids).await
}

async fn role_permission_ids(
    records: &dyn RecordStore,
    role_id: Option<Uuid>,
) -> StoreResult<Vec<Uuid>> {
    let Some(role_id) = role_id else {
        return Ok(Vec::new());
    };
    Ok(records
        .find_role_by_id(role_id)
        .await?
        .map(|role| role.permission_ids)
        .unwrap_or_default())
}

async fn permission_names(records: &dyn RecordStore, ids: &[Uuid]) -> StoreResult<BTreeSet<String>> {
    if ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    Ok(records
        .find_permissions_by_ids(&unique)
        .await?
        .into_iter()
        .map(|p| p.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::{Admin, MemoryRecordStore, NewUser, Permission, StoreError, User};

    async fn permission(store: &MemoryRecordStore, name: &str) -> Uuid {
        store.create_permission(name).await.unwrap().id
    }

    async fn user(store: &MemoryRecordStore, role_id: Option<Uuid>, direct: Vec<Uuid>) -> User {
        store
            .create_user(NewUser {
                email: format!("{}@school.test", Uuid::now_v7()),
                full_name: "Pupil".into(),
                password_hash: "hash".into(),
                role_id,
                permission_ids: direct,
            })
            .await
            .unwrap()
    }

    fn admin(id: Uuid, role_id: Option<Uuid>) -> Admin {
        let now = Utc::now();
        Admin {
            id,
            email: format!("{id}@school.test"),
            full_name: "Admin".into(),
            password_hash: "hash".into(),
            role: Some("ADMIN".into()),
            role_id,
            otp: None,
            otp_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_user_union_of_role_and_direct() {
        let store = MemoryRecordStore::new();
        let read = permission(&store, "school:read").await;
        let write = permission(&store, "school:write").await;
        let role = store.create_role("ADMIN", &[read]).await.unwrap();
        let user = user(&store, Some(role.id), vec![write, read]).await;

        let resolved = resolve_permissions(&store, user.id).await.unwrap();
        assert_eq!(resolved, names(&["school:read", "school:write"]));
    }

    #[tokio::test]
    async fn test_deleted_permissions_contribute_nothing() {
        let store = MemoryRecordStore::new();
        let read = permission(&store, "school:read").await;
        let gone = permission(&store, "school:delete").await;
        let user = user(&store, None, vec![read, gone]).await;
        store.remove_permission(gone);

        let resolved = resolve_permissions(&store, user.id).await.unwrap();
        assert_eq!(resolved, names(&["school:read"]));
    }

    #[tokio::test]
    async fn test_dangling_role_contributes_nothing() {
        let store = MemoryRecordStore::new();
        let read = permission(&store, "student:read").await;
        let role = store.create_role("SUPPORT", &[read]).await.unwrap();
        let user = user(&store, Some(role.id), Vec::new()).await;
        store.remove_role(role.id);

        let resolved = resolve_permissions(&store, user.id).await.unwrap();
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_admin_uses_role_permissions_only() {
        let store = MemoryRecordStore::new();
        let read = permission(&store, "admin:read").await;
        let role = store.create_role("ADMIN", &[read]).await.unwrap();
        let id = Uuid::now_v7();
        store.insert_admin(admin(id, Some(role.id)));

        let resolved = resolve_permissions(&store, id).await.unwrap();
        assert_eq!(resolved, names(&["admin:read"]));
    }

    #[tokio::test]
    async fn test_found_user_never_falls_through_to_admin() {
        let store = MemoryRecordStore::new();
        let read = permission(&store, "admin:read").await;
        let role = store.create_role("ADMIN", &[read]).await.unwrap();
        let user = user(&store, None, Vec::new()).await;
        store.insert_admin(admin(user.id, Some(role.id)));

        let resolved = resolve_permissions(&store, user.id).await.unwrap();
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_principal_is_empty() {
        let store = MemoryRecordStore::new();
        let resolved = resolve_permissions(&store, Uuid::now_v7()).await.unwrap();
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_blank_names_are_dropped() {
        let store = MemoryRecordStore::new();
        let blank = Uuid::now_v7();
        store.insert_permission(Permission {
            id: blank,
            name: "  ".into(),
            created_at: Utc::now(),
        });
        let user = user(&store, None, vec![blank]).await;

        let resolved = resolve_permissions(&store, user.id).await.unwrap();
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MemoryRecordStore::new();
        store.set_unavailable(true);

        let result = resolve_permissions(&store, Uuid::now_v7()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
