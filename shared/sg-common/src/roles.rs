//! Role names.
//!
//! Roles are free-text records in the store. Names are compared after
//! trimming and upper-casing, so `" admin "` and `"ADMIN"` are the same role.

/// Canonical role names used by route declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleName {
    SuperAdmin,
    Admin,
    SchoolAdmin,
    Support,
}

impl RoleName {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Admin => "ADMIN",
            Self::SchoolAdmin => "SCHOOL_ADMIN",
            Self::Support => "SUPPORT",
        }
    }

    /// Roles allowed on platform-administration routes (register admins).
    pub const SUPER_ADMIN_ONLY: &'static [Self] = &[Self::SuperAdmin];

    /// Every staff role; read access and self-service admin routes.
    pub const STAFF: &'static [Self] = &[
        Self::SuperAdmin,
        Self::Admin,
        Self::SchoolAdmin,
        Self::Support,
    ];
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Normalize a role name for comparison.
///
/// # Examples
///
/// ```
/// use sg_common::normalize_role_name;
///
/// assert_eq!(normalize_role_name("  school_admin "), "SCHOOL_ADMIN");
/// ```
#[must_use]
pub fn normalize_role_name(name: &str) -> String {
    name.trim().to_uppercase()
}
