//! Role resolution.
//!
//! A principal's effective role name comes from the first source in
//! [`ROLE_RESOLUTION_ORDER`] that yields one.

use sg_common::normalize_role_name;
use uuid::Uuid;

use crate::auth::AuthPrincipal;
use crate::db::{RecordStore, StoreResult};

/// Where a role name may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSource {
    /// The request principal's role id, looked up in the role table.
    RequestRoleId,
    /// The request principal's legacy role label.
    RequestRoleLabel,
    /// The admin record with the principal's id: role id first, then label.
    AdminRecord,
    /// The user record with the principal's id: role id only.
    UserRecord,
}

/// Role sources in priority order. First match wins.
pub const ROLE_RESOLUTION_ORDER: [RoleSource; 4] = [
    RoleSource::RequestRoleId,
    RoleSource::RequestRoleLabel,
    RoleSource::AdminRecord,
    RoleSource::UserRecord,
];

impl RoleSource {
    /// Try to produce a role name from this source.
    pub async fn resolve(
        self,
        records: &dyn RecordStore,
        principal: &AuthPrincipal,
    ) -> StoreResult<Option<String>> {
        match self {
            Self::RequestRoleId => role_name_by_id(records, principal.role_id).await,
            Self::RequestRoleLabel => Ok(non_blank(principal.role.as_deref())),
            Self::AdminRecord => {
                let Some(admin) = records.find_admin_by_id(principal.id).await? else {
                    return Ok(None);
                };
                if let Some(name) = role_name_by_id(records, admin.role_id).await? {
                    return Ok(Some(name));
                }
                Ok(non_blank(admin.role.as_deref()))
            }
            Self::UserRecord => {
                let Some(user) = records.find_user_by_id(principal.id).await? else {
                    return Ok(None);
                };
                role_name_by_id(records, user.role_id).await
            }
        }
    }
}

async fn role_name_by_id(
    records: &dyn RecordStore,
    role_id: Option<Uuid>,
) -> StoreResult<Option<String>> {
    let Some(role_id) = role_id else {
        return Ok(None);
    };
    Ok(records
        .find_role_by_id(role_id)
        .await?
        .and_then(|role| non_blank(Some(&role.name))))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolve the effective role name of a request principal.
#[tracing::instrument(skip(records, principal), fields(principal_id = %principal.id))]
pub async fn resolve_role_name(
    records: &dyn RecordStore,
    principal: &AuthPrincipal,
) -> StoreResult<Option<String>> {
    for source in ROLE_RESOLUTION_ORDER {
        if let Some(name) = source.resolve(records, principal).await? {
            tracing::debug!(?source, role = %name, "Resolved role");
            return Ok(Some(name));
        }
    }
    Ok(None)
}

/// Whether `role` is one of `allowed`, ignoring case and surrounding space.
#[must_use]
pub fn role_allowed(role: &str, allowed: &[String]) -> bool {
    let role = normalize_role_name(role);
    !role.is_empty() && allowed.iter().any(|a| normalize_role_name(a) == role)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::{Admin, MemoryRecordStore, NewUser};

    fn principal(id: Uuid, role: Option<&str>, role_id: Option<Uuid>) -> AuthPrincipal {
        AuthPrincipal {
            id,
            email: "someone@school.test".into(),
            role: role.map(str::to_string),
            role_id,
            permission_ids: Vec::new(),
        }
    }

    fn admin(id: Uuid, role: Option<&str>, role_id: Option<Uuid>) -> Admin {
        let now = Utc::now();
        Admin {
            id,
            email: format!("{id}@school.test"),
            full_name: "Admin".into(),
            password_hash: "hash".into(),
            role: role.map(str::to_string),
            role_id,
            otp: None,
            otp_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolution_order() {
        assert_eq!(
            ROLE_RESOLUTION_ORDER,
            [
                RoleSource::RequestRoleId,
                RoleSource::RequestRoleLabel,
                RoleSource::AdminRecord,
                RoleSource::UserRecord,
            ]
        );
    }

    #[tokio::test]
    async fn test_role_id_wins_over_label() {
        let store = MemoryRecordStore::new();
        let role = store.create_role("SCHOOL_ADMIN", &[]).await.unwrap();
        let p = principal(Uuid::now_v7(), Some("SUPPORT"), Some(role.id));

        let name = resolve_role_name(&store, &p).await.unwrap();
        assert_eq!(name.as_deref(), Some("SCHOOL_ADMIN"));
    }

    #[tokio::test]
    async fn test_dangling_role_id_falls_back_to_label() {
        let store = MemoryRecordStore::new();
        let p = principal(Uuid::now_v7(), Some("SUPPORT"), Some(Uuid::now_v7()));

        let name = resolve_role_name(&store, &p).await.unwrap();
        assert_eq!(name.as_deref(), Some("SUPPORT"));
    }

    #[tokio::test]
    async fn test_admin_record_role_id_then_label() {
        let store = MemoryRecordStore::new();
        let role = store.create_role("ADMIN", &[]).await.unwrap();

        let with_role = Uuid::now_v7();
        store.insert_admin(admin(with_role, Some("SUPPORT"), Some(role.id)));
        let name = resolve_role_name(&store, &principal(with_role, None, None))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("ADMIN"));

        let label_only = Uuid::now_v7();
        store.insert_admin(admin(label_only, Some(" super_admin "), None));
        let name = resolve_role_name(&store, &principal(label_only, None, None))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("super_admin"));
    }

    #[tokio::test]
    async fn test_user_record_role_id() {
        let store = MemoryRecordStore::new();
        let role = store.create_role("SUPPORT", &[]).await.unwrap();
        let user = store
            .create_user(NewUser {
                email: "pupil@school.test".into(),
                full_name: "Pupil".into(),
                password_hash: "hash".into(),
                role_id: Some(role.id),
                permission_ids: Vec::new(),
            })
            .await
            .unwrap();

        let name = resolve_role_name(&store, &principal(user.id, None, None))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("SUPPORT"));
    }

    #[tokio::test]
    async fn test_no_role_anywhere() {
        let store = MemoryRecordStore::new();
        let name = resolve_role_name(&store, &principal(Uuid::now_v7(), Some("  "), None))
            .await
            .unwrap();
        assert!(name.is_none());
    }

    #[test]
    fn test_role_allowed_is_case_and_space_insensitive() {
        let allowed = vec!["SUPER_ADMIN".to_string(), "ADMIN".to_string()];
        assert!(role_allowed("admin", &allowed));
        assert!(role_allowed(" super_admin ", &allowed));
        assert!(!role_allowed("support", &allowed));
        assert!(!role_allowed("", &allowed));

        let super_only = vec!["SUPER_ADMIN".to_string()];
        assert!(role_allowed("super_admin", &super_only));
        assert!(!role_allowed("admin", &super_only));
    }
}
