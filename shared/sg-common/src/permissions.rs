//! Permission catalog.
//!
//! Permission names follow the `<resource>:<action>` convention, lower-case
//! and colon-delimited (e.g. `student:enroll`).

/// Every permission the platform knows about.
///
/// The server stores permissions by name; this enum is the canonical source
/// for seeding and for route declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Permission {
    AdminCreate,
    AdminRead,
    AdminLogout,
    UserLogout,
    UserChangePassword,
    RoleCreate,
    RoleRead,
    RoleUpdate,
    RoleDelete,
    PermissionCreate,
    PermissionRead,
    PermissionUpdate,
    PermissionDelete,
    SchoolCreate,
    SchoolRead,
    SchoolUpdate,
    SchoolDelete,
    ClassroomCreate,
    ClassroomRead,
    ClassroomUpdate,
    ClassroomDelete,
    StudentCreate,
    StudentRead,
    StudentUpdate,
    StudentDelete,
    StudentEnroll,
    StudentTransfer,
}

impl Permission {
    /// Stored name of the permission.
    ///
    /// # Examples
    ///
    /// ```
    /// use sg_common::Permission;
    ///
    /// assert_eq!(Permission::StudentEnroll.as_str(), "student:enroll");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AdminCreate => "admin:create",
            Self::AdminRead => "admin:read",
            Self::AdminLogout => "admin:logout",
            Self::UserLogout => "user:logout",
            Self::UserChangePassword => "user:change-password",
            Self::RoleCreate => "role:create",
            Self::RoleRead => "role:read",
            Self::RoleUpdate => "role:update",
            Self::RoleDelete => "role:delete",
            Self::PermissionCreate => "permission:create",
            Self::PermissionRead => "permission:read",
            Self::PermissionUpdate => "permission:update",
            Self::PermissionDelete => "permission:delete",
            Self::SchoolCreate => "school:create",
            Self::SchoolRead => "school:read",
            Self::SchoolUpdate => "school:update",
            Self::SchoolDelete => "school:delete",
            Self::ClassroomCreate => "classroom:create",
            Self::ClassroomRead => "classroom:read",
            Self::ClassroomUpdate => "classroom:update",
            Self::ClassroomDelete => "classroom:delete",
            Self::StudentCreate => "student:create",
            Self::StudentRead => "student:read",
            Self::StudentUpdate => "student:update",
            Self::StudentDelete => "student:delete",
            Self::StudentEnroll => "student:enroll",
            Self::StudentTransfer => "student:transfer",
        }
    }

    /// Returns all permissions as a slice.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::AdminCreate,
            Self::AdminRead,
            Self::AdminLogout,
            Self::UserLogout,
            Self::UserChangePassword,
            Self::RoleCreate,
            Self::RoleRead,
            Self::RoleUpdate,
            Self::RoleDelete,
            Self::PermissionCreate,
            Self::PermissionRead,
            Self::PermissionUpdate,
            Self::PermissionDelete,
            Self::SchoolCreate,
            Self::SchoolRead,
            Self::SchoolUpdate,
            Self::SchoolDelete,
            Self::ClassroomCreate,
            Self::ClassroomRead,
            Self::ClassroomUpdate,
            Self::ClassroomDelete,
            Self::StudentCreate,
            Self::StudentRead,
            Self::StudentUpdate,
            Self::StudentDelete,
            Self::StudentEnroll,
            Self::StudentTransfer,
        ]
    }

    /// Look up a catalog entry by its stored name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|p| p.as_str() == name)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<Permission> for &'static str {
    fn from(value: Permission) -> Self {
        value.as_str()
    }
}

impl TryFrom<String> for Permission {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_name(&value).ok_or_else(|| format!("unknown permission '{value}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names_follow_convention() {
        for permission in Permission::all() {
            let (resource, action) = permission
                .as_str()
                .split_once(':')
                .unwrap_or_else(|| panic!("{permission} does not follow <resource>:<action>"));
            assert!(!resource.is_empty() && !action.is_empty());
        }
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let mut names: Vec<_> = Permission::all().iter().map(|p| p.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Permission::all().len());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            Permission::from_name("school:delete"),
            Some(Permission::SchoolDelete)
        );
        assert_eq!(Permission::from_name("school:explode"), None);
    }

    #[test]
    fn test_serde_uses_stored_name() {
        let json = serde_json::to_string(&Permission::StudentTransfer).unwrap();
        assert_eq!(json, "\"student:transfer\"");

        let parsed: Permission = serde_json::from_str("\"role:delete\"").unwrap();
        assert_eq!(parsed, Permission::RoleDelete);
    }
}
