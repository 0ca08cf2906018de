//! Authentication Middleware

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;

use super::error::AuthError;
use super::jwt::{validate_token, Claims};

/// Authenticated principal injected into request extensions.
///
/// Mirrors the token claims. The gates read it to decide role and
/// permission access.
#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    pub id: Uuid,
    pub email: String,
    /// Legacy role label carried by the token.
    pub role: Option<String>,
    pub role_id: Option<Uuid>,
    pub permission_ids: Vec<Uuid>,
}

impl From<Claims> for AuthPrincipal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            role: claims.role,
            role_id: claims.role_id,
            permission_ids: claims.permission_ids.unwrap_or_default(),
        }
    }
}

/// Middleware to require authentication.
///
/// Extracts the Bearer token, validates it, confirms the principal still has
/// a live session and injects `AuthPrincipal` into request extensions.
///
/// ```ignore
/// Router::new()
///     .route("/protected", get(handler))
///     .layer(axum::middleware::from_fn_with_state(state, require_auth))
/// ```
#[tracing::instrument(skip_all)]
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)?;

    let claims = validate_token(token, &state.config.access_token_secret)?;

    if state.sessions.get_session(claims.id).await?.is_none() {
        tracing::debug!(principal_id = %claims.id, "Token presented without a live session");
        return Err(AuthError::SessionExpired);
    }

    request
        .extensions_mut()
        .insert(AuthPrincipal::from(claims));

    Ok(next.run(request).await)
}

/// Extractor for the authenticated principal in handlers.
///
/// ```ignore
/// async fn protected_handler(principal: AuthPrincipal) -> impl IntoResponse {
///     format!("Hello, {}!", principal.email)
/// }
/// ```
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AuthError::Unauthenticated("User not authenticated".to_string()))
    }
}
