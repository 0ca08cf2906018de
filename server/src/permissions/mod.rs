//! Role and permission authorization.
//!
//! Resolution of a principal's effective role and permission set, and the
//! route gates that enforce them.

pub mod gates;
pub mod resolver;
pub mod roles;

pub use gates::{authorize_roles, require_permission, GateRejection};
pub use resolver::{load_principal, permissions_for, resolve_permissions};
pub use roles::{resolve_role_name, role_allowed, RoleSource, ROLE_RESOLUTION_ORDER};
