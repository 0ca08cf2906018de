//! JWT Token Generation and Validation
//!
//! HS256 with a process-wide shared secret. Tokens carry a snapshot of the
//! principal so the gates can resolve roles without a store round-trip.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{AuthError, AuthResult};
use crate::db::Principal;

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Principal ID.
    pub id: Uuid,
    pub email: String,
    /// Legacy role label (admins only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
    /// Direct permission grants (users only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_ids: Option<Vec<Uuid>>,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
}

/// Sign an access token for a principal.
pub fn issue_token(principal: &Principal, secret: &str, validity_seconds: u64) -> AuthResult<String> {
    let now = Utc::now();
    let expires_at = i64::try_from(validity_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|validity| now.checked_add_signed(validity))
        .ok_or_else(|| AuthError::Internal("Token validity out of range".to_string()))?;

    let claims = Claims {
        id: principal.id(),
        email: principal.email().to_string(),
        role: principal.role_label().map(str::to_string),
        role_id: principal.role_id(),
        permission_ids: principal.direct_permission_ids().map(<[Uuid]>::to_vec),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Validate and decode an access token.
pub fn validate_token(token: &str, secret: &str) -> AuthResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.required_spec_claims.clear();
    validation.required_spec_claims.insert("exp".to_string());

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Admin, User};

    const SECRET: &str = "test-secret";

    fn admin() -> Principal {
        let now = Utc::now();
        Principal::Admin(Admin {
            id: Uuid::now_v7(),
            email: "head@school.test".into(),
            full_name: "Head Teacher".into(),
            password_hash: "hash".into(),
            role: Some("SUPER_ADMIN".into()),
            role_id: Some(Uuid::now_v7()),
            otp: None,
            otp_expires_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn user() -> Principal {
        let now = Utc::now();
        Principal::User(User {
            id: Uuid::now_v7(),
            email: "pupil@school.test".into(),
            full_name: "Pupil".into(),
            password_hash: "hash".into(),
            is_active: true,
            role_id: None,
            permission_ids: vec![Uuid::now_v7()],
            otp: None,
            otp_expires_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn test_admin_token_round_trip() {
        let principal = admin();
        let token = issue_token(&principal, SECRET, 1800).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();

        assert_eq!(claims.id, principal.id());
        assert_eq!(claims.email, "head@school.test");
        assert_eq!(claims.role.as_deref(), Some("SUPER_ADMIN"));
        assert_eq!(claims.role_id, principal.role_id());
        assert!(claims.permission_ids.is_none());
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_user_token_carries_direct_permissions() {
        let principal = user();
        let token = issue_token(&principal, SECRET, 600).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();

        assert!(claims.role.is_none());
        assert_eq!(
            claims.permission_ids.as_deref(),
            principal.direct_permission_ids()
        );
    }

    #[test]
    fn test_wrong_secret_fails() {
        let token = issue_token(&admin(), SECRET, 600).unwrap();
        let result = validate_token(&token, "other-secret");
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_fails() {
        let now = Utc::now();
        let claims = Claims {
            id: Uuid::now_v7(),
            email: "late@school.test".into(),
            role: None,
            role_id: None,
            permission_ids: None,
            exp: (now - Duration::seconds(60)).timestamp(),
            iat: (now - Duration::seconds(120)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let result = validate_token(&token, SECRET);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_out_of_range_validity_is_an_error() {
        let result = issue_token(&admin(), SECRET, 10_000_000_000_000_000);
        assert!(matches!(result, Err(AuthError::Internal(_))));

        let result = issue_token(&admin(), SECRET, u64::MAX);
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[test]
    fn test_garbage_token_fails() {
        let result = validate_token("not.a.token", SECRET);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
