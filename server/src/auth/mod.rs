//! Authentication Service
//!
//! Credential verification, token issuing, sessions and the admin and user
//! auth routes.

mod error;
mod handlers;
pub mod jwt;
mod middleware;
pub mod password;
pub mod session;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use sg_common::{Permission, RoleName};

use crate::api::AppState;
use crate::permissions::{authorize_roles, require_permission};

pub use error::{AuthError, AuthResult, ErrorEnvelope};
pub use handlers::{ApiResponse, LoginResponse};
pub use middleware::{require_auth, AuthPrincipal};
pub use session::{SessionError, SessionPayload, SessionStore};

/// Create the admin authentication router.
///
/// Public routes:
/// - POST /login
/// - POST /forgot-password
/// - POST /reset-password
///
/// Protected routes:
/// - POST /register - `SUPER_ADMIN` with `admin:create`
/// - GET /profile - any staff role
/// - GET /logout - any staff role
/// - GET /permissions - any staff role
pub fn admin_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/login", post(handlers::admin_login))
        .route("/forgot-password", post(handlers::admin_forgot_password))
        .route("/reset-password", post(handlers::admin_reset_password));

    let register_route = Router::new()
        .route("/register", post(handlers::admin_register))
        .route_layer(from_fn(require_permission(
            state.clone(),
            Permission::AdminCreate,
        )))
        .route_layer(from_fn(authorize_roles(
            state.clone(),
            RoleName::SUPER_ADMIN_ONLY,
        )));

    let staff_routes = Router::new()
        .route("/profile", get(handlers::admin_profile))
        .route("/logout", get(handlers::admin_logout))
        .route("/permissions", get(handlers::admin_permissions))
        .route_layer(from_fn(authorize_roles(state.clone(), RoleName::STAFF)));

    let protected_routes = register_route
        .merge(staff_routes)
        .route_layer(from_fn_with_state(state, require_auth));

    public_routes.merge(protected_routes)
}

/// Create the user authentication router.
///
/// Public routes:
/// - POST /register
/// - POST /login
/// - POST /forgot-password
/// - POST /reset-password
///
/// Protected routes (auth required):
/// - POST /logout
/// - POST /change-password
/// - GET /me/permissions
pub fn user_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/register", post(handlers::user_register))
        .route("/login", post(handlers::user_login))
        .route("/forgot-password", post(handlers::user_forgot_password))
        .route("/reset-password", post(handlers::user_reset_password));

    let protected_routes = Router::new()
        .route("/logout", post(handlers::user_logout))
        .route("/change-password", post(handlers::user_change_password))
        .route("/me/permissions", get(handlers::user_permissions))
        .route_layer(from_fn_with_state(state, require_auth));

    public_routes.merge(protected_routes)
}
