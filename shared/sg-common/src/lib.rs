//! Schoolgate Common Library
//!
//! Role and permission vocabulary shared by the server and its tooling.

pub mod permissions;
pub mod roles;

pub use permissions::Permission;
pub use roles::{normalize_role_name, RoleName};
