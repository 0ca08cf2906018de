//! Authentication Handlers
//!
//! Admin and user login, registration, logout and password flows.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::error::{AuthError, AuthResult};
use super::jwt::issue_token;
use super::middleware::AuthPrincipal;
use super::password::{generate_reset_code, hash_password, verify_password, PasswordPolicy};
use super::session::{ttl_seconds, SessionPayload};
use crate::api::{trimmed, AppState, ValidatedJson};
use crate::db::{Admin, NewAdmin, NewUser, Principal, PrincipalKind, StoreError};
use crate::permissions::resolve_permissions;

const INCORRECT_LOGIN: &str = "Incorrect login details";
const EMAIL_IN_USE: &str = "Email already in use";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: None,
        })
    }
}

/// Login success body.
#[derive(Debug, Serialize)]
pub struct LoginResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub token: String,
}

/// Login request (admins and users).
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Forgot password request (admins and users).
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
}

/// Admin registration request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminRegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 128, message = "fullName is required"))]
    pub full_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
    pub password: String,
    /// Legacy role label.
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 64, message = "role is required"))]
    pub role: String,
    pub role_id: Option<Uuid>,
}

/// Admin reset password request.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminResetPasswordRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, message = "otp_token is required"))]
    pub otp_token: String,
}

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct UserRegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 128, message = "name is required"))]
    pub name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
    pub password: String,
}

/// User reset password request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserResetPasswordRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
    pub new_password: String,
}

/// Change password request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "oldPassword is required"))]
    pub old_password: String,
    pub new_password: String,
}

/// Admin summary returned by login and registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// User summary returned by login and registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role_id: Option<Uuid>,
    pub permission_ids: Vec<Uuid>,
}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Issue a token and replace the principal's session.
async fn start_session(state: &AppState, principal: &Principal) -> AuthResult<String> {
    let validity = ttl_seconds(state.sessions.validity());
    let token = issue_token(principal, &state.config.access_token_secret, validity)?;
    state
        .sessions
        .create_session(principal.id(), &SessionPayload::from(principal))
        .await?;
    Ok(token)
}

/// Check a supplied reset code against the stored one and its expiry.
fn check_reset_code(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    supplied: &str,
    now: DateTime<Utc>,
) -> AuthResult<()> {
    if stored != Some(supplied) {
        return Err(AuthError::BadRequest("Invalid OTP".to_string()));
    }
    match expires_at {
        Some(expires_at) if now <= expires_at => Ok(()),
        _ => Err(AuthError::BadRequest("Expired OTP".to_string())),
    }
}

fn email_conflict(err: StoreError, as_status: fn(String) -> AuthError) -> AuthError {
    match err {
        StoreError::Conflict(_) => as_status(EMAIL_IN_USE.to_string()),
        other => AuthError::Store(other),
    }
}

/// Issue and store a reset code for a principal.
async fn issue_reset_code(state: &AppState, kind: PrincipalKind, id: Uuid) -> AuthResult<()> {
    let code = generate_reset_code();
    let expires_at = Duration::try_seconds(state.config.otp_validity_seconds)
        .and_then(|validity| Utc::now().checked_add_signed(validity))
        .ok_or_else(|| AuthError::Internal("Reset code validity out of range".to_string()))?;
    state
        .records
        .set_reset_code(kind, id, &code, expires_at)
        .await?;
    tracing::info!(principal_id = %id, kind = kind.as_str(), "Password reset code issued");
    Ok(())
}

/// Map a store write that matched no row to a not-found error.
fn ensure_updated(updated: bool) -> AuthResult<()> {
    if updated {
        Ok(())
    } else {
        Err(AuthError::NotFound("User not found".to_string()))
    }
}

/// Replace a principal's password and drop its session.
async fn replace_password(
    state: &AppState,
    kind: PrincipalKind,
    id: Uuid,
    password: &str,
) -> AuthResult<()> {
    let password_hash = hash_password(password).await?;
    ensure_updated(
        state
            .records
            .update_password(kind, id, &password_hash)
            .await?,
    )?;
    state.sessions.delete_session(id).await?;
    Ok(())
}

async fn admin_role_display(state: &AppState, admin: &Admin) -> AuthResult<String> {
    if let Some(label) = admin.role.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        return Ok(label.to_string());
    }
    if let Some(role_id) = admin.role_id {
        if let Some(role) = state.records.find_role_by_id(role_id).await? {
            return Ok(role.name);
        }
    }
    Ok("Admin".to_string())
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// Admin login.
///
/// POST /v1/admin/auth/login
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn admin_login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> AuthResult<Json<LoginResponse<AdminSummary>>> {
    let admin = state
        .records
        .find_admin_by_email(&body.email)
        .await?
        .ok_or_else(|| AuthError::BadRequest(INCORRECT_LOGIN.to_string()))?;

    if !verify_password(&body.password, &admin.password_hash).await? {
        return Err(AuthError::Unauthenticated(INCORRECT_LOGIN.to_string()));
    }

    let role = admin_role_display(&state, &admin).await?;
    let principal = Principal::Admin(admin);
    let token = start_session(&state, &principal).await?;

    tracing::info!(admin_id = %principal.id(), "Admin logged in");

    Ok(Json(LoginResponse {
        success: true,
        message: format!("Welcome {role} {}", principal.full_name()),
        data: AdminSummary {
            id: principal.id(),
            email: principal.email().to_string(),
            full_name: None,
            role: None,
        },
        token,
    }))
}

/// Register a new admin.
///
/// POST /v1/admin/auth/register
#[tracing::instrument(skip_all, fields(email = %body.email, created_by = %principal.id))]
pub async fn admin_register(
    State(state): State<AppState>,
    principal: AuthPrincipal,
    ValidatedJson(body): ValidatedJson<AdminRegisterRequest>,
) -> AuthResult<(StatusCode, Json<ApiResponse<AdminSummary>>)> {
    PasswordPolicy::new(state.config.password_min_length).validate(&body.password)?;

    if state
        .records
        .find_admin_by_email(&body.email)
        .await?
        .is_some()
    {
        return Err(AuthError::Conflict(EMAIL_IN_USE.to_string()));
    }

    let password_hash = hash_password(&body.password).await?;
    let admin = state
        .records
        .create_admin(NewAdmin {
            email: body.email,
            full_name: body.full_name,
            password_hash,
            role: Some(body.role),
            role_id: body.role_id,
        })
        .await
        .map_err(|e| email_conflict(e, AuthError::Conflict))?;

    tracing::info!(admin_id = %admin.id, "Admin registered");

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            "Success! admin created",
            AdminSummary {
                id: admin.id,
                email: admin.email,
                full_name: Some(admin.full_name),
                role: admin.role,
            },
        ),
    ))
}

/// Get the calling admin's profile.
///
/// GET /v1/admin/auth/profile
#[tracing::instrument(skip_all, fields(admin_id = %principal.id))]
pub async fn admin_profile(
    State(state): State<AppState>,
    principal: AuthPrincipal,
) -> AuthResult<Json<ApiResponse<Admin>>> {
    let admin = state
        .records
        .find_admin_by_id(principal.id)
        .await?
        .ok_or_else(|| AuthError::NotFound("Admin not found".to_string()))?;

    Ok(ApiResponse::ok("Profile fetched successfully", admin))
}

/// Log the calling admin out.
///
/// GET /v1/admin/auth/logout
#[tracing::instrument(skip_all, fields(admin_id = %principal.id))]
pub async fn admin_logout(
    State(state): State<AppState>,
    principal: AuthPrincipal,
) -> AuthResult<Json<ApiResponse<()>>> {
    state.sessions.delete_session(principal.id).await?;
    tracing::info!("Admin logged out");
    Ok(ApiResponse::message("Admin successfully logged out"))
}

/// Issue an admin password reset code.
///
/// POST /v1/admin/auth/forgot-password
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn admin_forgot_password(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ForgotPasswordRequest>,
) -> AuthResult<Json<ApiResponse<()>>> {
    let admin = state
        .records
        .find_admin_by_email(&body.email)
        .await?
        .ok_or_else(|| AuthError::NotFound("Admin not found".to_string()))?;

    issue_reset_code(&state, PrincipalKind::Admin, admin.id).await?;
    Ok(ApiResponse::message("Otp sent successfully!"))
}

/// Reset an admin password with a reset code.
///
/// POST /v1/admin/auth/reset-password
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn admin_reset_password(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<AdminResetPasswordRequest>,
) -> AuthResult<Json<ApiResponse<()>>> {
    PasswordPolicy::new(state.config.password_min_length).validate(&body.password)?;

    let admin = state
        .records
        .find_admin_by_email(&body.email)
        .await?
        .ok_or_else(|| AuthError::NotFound("Admin not found".to_string()))?;

    check_reset_code(
        admin.otp.as_deref(),
        admin.otp_expires_at,
        &body.otp_token,
        Utc::now(),
    )?;
    replace_password(&state, PrincipalKind::Admin, admin.id, &body.password).await?;

    tracing::info!(admin_id = %admin.id, "Admin password reset");
    Ok(ApiResponse::message("Password reset successfully!"))
}

/// List the calling admin's permissions.
///
/// GET /v1/admin/auth/permissions
#[tracing::instrument(skip_all, fields(admin_id = %principal.id))]
pub async fn admin_permissions(
    State(state): State<AppState>,
    principal: AuthPrincipal,
) -> AuthResult<Json<ApiResponse<Vec<String>>>> {
    let permissions = resolve_permissions(state.records.as_ref(), principal.id).await?;
    Ok(ApiResponse::ok(
        "Permissions fetched successfully",
        permissions.into_iter().collect(),
    ))
}

// ============================================================================
// User Handlers
// ============================================================================

/// Register a new user.
///
/// POST /v1/auth/register
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn user_register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<UserRegisterRequest>,
) -> AuthResult<(StatusCode, Json<ApiResponse<UserSummary>>)> {
    PasswordPolicy::new(state.config.password_min_length).validate(&body.password)?;

    if state
        .records
        .find_user_by_email(&body.email)
        .await?
        .is_some()
    {
        return Err(AuthError::BadRequest(EMAIL_IN_USE.to_string()));
    }

    let password_hash = hash_password(&body.password).await?;
    let user = state
        .records
        .create_user(NewUser {
            email: body.email,
            full_name: body.name,
            password_hash,
            role_id: None,
            permission_ids: Vec::new(),
        })
        .await
        .map_err(|e| email_conflict(e, AuthError::BadRequest))?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            "Success! user created",
            UserSummary {
                id: user.id,
                email: user.email,
                full_name: Some(user.full_name),
                role_id: user.role_id,
                permission_ids: user.permission_ids,
            },
        ),
    ))
}

/// User login.
///
/// POST /v1/auth/login
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn user_login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> AuthResult<Json<LoginResponse<UserSummary>>> {
    let user = state
        .records
        .find_user_by_email(&body.email)
        .await?
        .ok_or_else(|| AuthError::BadRequest(INCORRECT_LOGIN.to_string()))?;

    if !verify_password(&body.password, &user.password_hash).await? {
        return Err(AuthError::BadRequest(INCORRECT_LOGIN.to_string()));
    }

    if !user.is_active {
        return Err(AuthError::Forbidden("Account is deactivated".to_string()));
    }

    let message = format!("Welcome {}", user.full_name);
    let data = UserSummary {
        id: user.id,
        email: user.email.clone(),
        full_name: None,
        role_id: user.role_id,
        permission_ids: user.permission_ids.clone(),
    };

    let principal = Principal::User(user);
    let token = start_session(&state, &principal).await?;

    tracing::info!(user_id = %principal.id(), "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        message,
        data,
        token,
    }))
}

/// Log the calling user out.
///
/// POST /v1/auth/logout
#[tracing::instrument(skip_all, fields(user_id = %principal.id))]
pub async fn user_logout(
    State(state): State<AppState>,
    principal: AuthPrincipal,
) -> AuthResult<Json<ApiResponse<()>>> {
    state.sessions.delete_session(principal.id).await?;
    tracing::info!("User logged out");
    Ok(ApiResponse::message("Logout successful"))
}

/// Issue a user password reset code.
///
/// POST /v1/auth/forgot-password
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn user_forgot_password(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ForgotPasswordRequest>,
) -> AuthResult<Json<ApiResponse<()>>> {
    let user = state
        .records
        .find_user_by_email(&body.email)
        .await?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

    issue_reset_code(&state, PrincipalKind::User, user.id).await?;
    Ok(ApiResponse::message("Reset email sent"))
}

/// Reset a user password with a reset code.
///
/// POST /v1/auth/reset-password
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn user_reset_password(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<UserResetPasswordRequest>,
) -> AuthResult<Json<ApiResponse<()>>> {
    PasswordPolicy::new(state.config.password_min_length).validate(&body.new_password)?;

    let user = state
        .records
        .find_user_by_email(&body.email)
        .await?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

    check_reset_code(
        user.otp.as_deref(),
        user.otp_expires_at,
        &body.code,
        Utc::now(),
    )?;
    replace_password(&state, PrincipalKind::User, user.id, &body.new_password).await?;

    tracing::info!(user_id = %user.id, "User password reset");
    Ok(ApiResponse::message("Password reset successfully!"))
}

/// Change the calling user's password.
///
/// POST /v1/auth/change-password
#[tracing::instrument(skip_all, fields(user_id = %principal.id))]
pub async fn user_change_password(
    State(state): State<AppState>,
    principal: AuthPrincipal,
    ValidatedJson(body): ValidatedJson<ChangePasswordRequest>,
) -> AuthResult<Json<ApiResponse<()>>> {
    let user = state
        .records
        .find_user_by_id(principal.id)
        .await?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

    if !verify_password(&body.old_password, &user.password_hash).await? {
        return Err(AuthError::BadRequest("Old password is incorrect".to_string()));
    }

    PasswordPolicy::new(state.config.password_min_length).validate(&body.new_password)?;

    let password_hash = hash_password(&body.new_password).await?;
    ensure_updated(
        state
            .records
            .update_password(PrincipalKind::User, user.id, &password_hash)
            .await?,
    )?;

    tracing::info!("User password changed");
    Ok(ApiResponse::message("Password changed successfully"))
}

/// List the calling user's permissions.
///
/// GET /v1/auth/me/permissions
#[tracing::instrument(skip_all, fields(user_id = %principal.id))]
pub async fn user_permissions(
    State(state): State<AppState>,
    principal: AuthPrincipal,
) -> AuthResult<Json<ApiResponse<Vec<String>>>> {
    let permissions = resolve_permissions(state.records.as_ref(), principal.id).await?;
    Ok(ApiResponse::ok(
        "Permissions fetched successfully",
        permissions.into_iter().collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_code_must_match() {
        let now = Utc::now();
        let later = Some(now + Duration::minutes(5));

        assert!(check_reset_code(Some("123456"), later, "123456", now).is_ok());
        assert!(matches!(
            check_reset_code(Some("123456"), later, "654321", now),
            Err(AuthError::BadRequest(m)) if m == "Invalid OTP"
        ));
        assert!(matches!(
            check_reset_code(None, later, "123456", now),
            Err(AuthError::BadRequest(m)) if m == "Invalid OTP"
        ));
    }

    #[test]
    fn test_reset_code_expiry_uses_stored_timestamp() {
        let now = Utc::now();
        let expired = Some(now - Duration::seconds(1));

        assert!(matches!(
            check_reset_code(Some("123456"), expired, "123456", now),
            Err(AuthError::BadRequest(m)) if m == "Expired OTP"
        ));
        assert!(matches!(
            check_reset_code(Some("123456"), None, "123456", now),
            Err(AuthError::BadRequest(m)) if m == "Expired OTP"
        ));
    }

    #[test]
    fn test_email_conflict_mapping() {
        let err = email_conflict(StoreError::Conflict("users_email_lower_key".into()), AuthError::BadRequest);
        assert!(matches!(err, AuthError::BadRequest(m) if m == EMAIL_IN_USE));

        let err = email_conflict(StoreError::Unavailable("down".into()), AuthError::Conflict);
        assert!(matches!(err, AuthError::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_unmatched_password_update_is_not_found() {
        assert!(ensure_updated(true).is_ok());
        assert!(matches!(
            ensure_updated(false),
            Err(AuthError::NotFound(m)) if m == "User not found"
        ));
    }
}
