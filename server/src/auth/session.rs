//! Session Store
//!
//! One live session per principal under `auth:sessions:<principalId>`. A
//! token is only honoured while its principal's session exists, so deleting
//! the key logs the principal out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::db::{KeyValueStore, KvError, Principal};

/// Key namespace for sessions.
pub const SESSION_KEY_PREFIX: &str = "auth:sessions:";

/// TTL used when the configured validity window cannot be parsed.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 1800;

/// Longest validity window accepted (ten years).
pub const MAX_VALIDITY_SECONDS: u64 = 10 * 365 * 86_400;

/// Session store errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session store error: {0}")]
    Store(#[from] KvError),

    #[error("Session payload is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Snapshot of a principal stored with its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_ids: Option<Vec<Uuid>>,
}

impl From<&Principal> for SessionPayload {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id(),
            email: principal.email().to_string(),
            role: principal.role_label().map(str::to_string),
            role_id: principal.role_id(),
            permission_ids: principal.direct_permission_ids().map(<[Uuid]>::to_vec),
        }
    }
}

/// Build the storage key for a principal's session.
#[must_use]
pub fn session_key(principal_id: Uuid) -> String {
    format!("{SESSION_KEY_PREFIX}{principal_id}")
}

/// Parse a validity window into whole seconds.
///
/// Accepts plain seconds (`"300"`), a compact form (`"10m"`, `"2h"`, `"1d"`,
/// `"45s"`) and a two-token form (`"15 minutes"`, `"1 day"`). Returns `None`
/// for anything else, including zero and windows over [`MAX_VALIDITY_SECONDS`].
#[must_use]
pub fn parse_validity_seconds(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    let seconds = match tokens.as_slice() {
        [single] => parse_compact(single)?,
        [amount, unit] => {
            let amount: u64 = parse_digits(amount)?;
            amount.checked_mul(unit_word_seconds(unit)?)?
        }
        _ => return None,
    };

    (1..=MAX_VALIDITY_SECONDS)
        .contains(&seconds)
        .then_some(seconds)
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_compact(s: &str) -> Option<u64> {
    if let Some(seconds) = parse_digits(s) {
        return Some(seconds);
    }

    let split = s.len().checked_sub(1)?;
    if !s.is_char_boundary(split) {
        return None;
    }
    let (amount, unit) = s.split_at(split);
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return None,
    };
    parse_digits(amount)?.checked_mul(multiplier)
}

fn unit_word_seconds(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "second" | "seconds" => Some(1),
        "minute" | "minutes" => Some(60),
        "hour" | "hours" => Some(3600),
        "day" | "days" => Some(86_400),
        _ => None,
    }
}

/// Resolve the TTL for a validity window, falling back to
/// [`DEFAULT_SESSION_TTL_SECONDS`] with a warning.
#[must_use]
pub fn ttl_seconds(validity: &str) -> u64 {
    parse_validity_seconds(validity).unwrap_or_else(|| {
        warn!(
            validity = %validity,
            fallback = DEFAULT_SESSION_TTL_SECONDS,
            "Invalid session validity, using default TTL"
        );
        DEFAULT_SESSION_TTL_SECONDS
    })
}

/// Session adapter over a key-value store.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    validity: String,
}

impl SessionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, validity: impl Into<String>) -> Self {
        Self {
            kv,
            validity: validity.into(),
        }
    }

    /// Configured validity window, unparsed.
    #[must_use]
    pub fn validity(&self) -> &str {
        &self.validity
    }

    /// Replace any existing session for `principal_id` with `payload`.
    #[tracing::instrument(skip(self, payload))]
    pub async fn create_session(
        &self,
        principal_id: Uuid,
        payload: &SessionPayload,
    ) -> Result<(), SessionError> {
        let key = session_key(principal_id);
        let value = serde_json::to_string(payload)?;

        if self.kv.get(&key).await?.is_some() {
            self.kv.delete(&key).await?;
        }

        let ttl = ttl_seconds(&self.validity);
        self.kv.set_with_expiry(&key, &value, ttl).await?;
        Ok(())
    }

    /// Load the live session for `principal_id`, if any.
    pub async fn get_session(
        &self,
        principal_id: Uuid,
    ) -> Result<Option<SessionPayload>, SessionError> {
        match self.kv.get(&session_key(principal_id)).await? {
            Some(value) if !value.trim().is_empty() => Ok(Some(serde_json::from_str(&value)?)),
            _ => Ok(None),
        }
    }

    /// Remove the session for `principal_id`. Succeeds whether or not one exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete_session(&self, principal_id: Uuid) -> Result<(), SessionError> {
        self.kv.delete(&session_key(principal_id)).await?;
        Ok(())
    }
}
