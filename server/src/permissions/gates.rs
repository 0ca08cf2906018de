//! Authorization gates.
//!
//! Route-level middleware that runs after `require_auth`:
//!
//! ```ignore
//! Router::new()
//!     .route("/register", post(handler))
//!     .route_layer(from_fn(require_permission(state.clone(), Permission::AdminCreate)))
//!     .route_layer(from_fn(authorize_roles(state.clone(), RoleName::SUPER_ADMIN_ONLY)))
//!     .route_layer(from_fn_with_state(state, require_auth))
//! ```
//!
//! Layers run bottom-up, so authentication happens first, then the role
//! check, then the permission check.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sg_common::normalize_role_name;

use super::resolver::resolve_permissions;
use super::roles::{resolve_role_name, role_allowed};
use crate::api::AppState;
use crate::auth::{AuthError, AuthPrincipal, ErrorEnvelope};

/// Boxed future returned by gate closures.
pub type GateFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Short rejection body used by the permission gate.
#[derive(Debug, Serialize)]
pub struct GateRejection {
    pub success: bool,
    pub message: String,
}

impl GateRejection {
    fn respond(status: StatusCode, message: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                success: false,
                message: message.into(),
            }),
        )
            .into_response()
    }
}

fn role_rejection(state: &AppState, status: StatusCode, code: &'static str, message: &str) -> Response {
    ErrorEnvelope::new(status, code, message)
        .with_service(state.config.service_name.as_deref())
        .into_response_with(status)
}

/// Allow the request only if the principal's role is one of `allowed`.
///
/// No principal yields 401. An unresolvable or disallowed role yields 403.
/// Store failures go to the central error handler.
pub fn authorize_roles<I, R>(
    state: AppState,
    allowed: I,
) -> impl Fn(Request, Next) -> GateFuture + Clone + Send + 'static
where
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    let allowed: Arc<[String]> = allowed
        .into_iter()
        .map(|r| normalize_role_name(r.as_ref()))
        .collect();

    move |request: Request, next: Next| -> GateFuture {
        let state = state.clone();
        let allowed = Arc::clone(&allowed);
        Box::pin(async move { check_roles(&state, &allowed, request, next).await })
    }
}

#[tracing::instrument(skip_all)]
async fn check_roles(state: &AppState, allowed: &[String], request: Request, next: Next) -> Response {
    let Some(principal) = request.extensions().get::<AuthPrincipal>().cloned() else {
        return role_rejection(
            state,
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "User not authenticated",
        );
    };

    let role = match resolve_role_name(state.records.as_ref(), &principal).await {
        Ok(role) => role,
        Err(e) => return AuthError::from(e).into_response(),
    };

    match role {
        Some(role) if role_allowed(&role, allowed) => next.run(request).await,
        role => {
            tracing::info!(
                principal_id = %principal.id,
                role = ?role,
                allowed = ?allowed,
                "Role check failed"
            );
            role_rejection(
                state,
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied. Insufficient role permissions.",
            )
        }
    }
}

/// Allow the request only if the principal holds `permission` (exact name).
///
/// No principal yields 401 without touching the store. A missing permission
/// yields 403. Store failures go to the central error handler.
pub fn require_permission(
    state: AppState,
    permission: impl AsRef<str>,
) -> impl Fn(Request, Next) -> GateFuture + Clone + Send + 'static {
    let permission: Arc<str> = Arc::from(permission.as_ref());

    move |request: Request, next: Next| -> GateFuture {
        let state = state.clone();
        let permission = Arc::clone(&permission);
        Box::pin(async move { check_permission(&state, &permission, request, next).await })
    }
}

#[tracing::instrument(skip(state, request, next))]
async fn check_permission(
    state: &AppState,
    permission: &str,
    request: Request,
    next: Next,
) -> Response {
    let Some(principal_id) = request.extensions().get::<AuthPrincipal>().map(|p| p.id) else {
        return GateRejection::respond(StatusCode::UNAUTHORIZED, "Unauthorized: No user ID found");
    };

    let granted = match resolve_permissions(state.records.as_ref(), principal_id).await {
        Ok(granted) => granted,
        Err(e) => return AuthError::from(e).into_response(),
    };

    if granted.contains(permission) {
        return next.run(request).await;
    }

    tracing::info!(%principal_id, "Permission check failed");
    GateRejection::respond(
        StatusCode::FORBIDDEN,
        format!("Forbidden: Missing permission '{permission}'"),
    )
}
