//! Request extractors.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::Validate;

use crate::auth::AuthError;

/// JSON body that has passed `validator` checks.
///
/// Malformed JSON and failed validation both reject with
/// `AuthError::Validation`, so clients always get the error envelope.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AuthError::Validation(e.body_text()))?;

        value
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        Ok(Self(value))
    }
}

/// Deserialize a string with surrounding whitespace removed.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?.trim().to_string())
}
