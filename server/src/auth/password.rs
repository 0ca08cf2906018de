//! Password Hashing and Policy
//!
//! bcrypt at a fixed cost of 9. Hashing and verification run on the blocking
//! pool.

use rand::Rng;
use thiserror::Error;

use crate::config::PASSWORD_MAX_LENGTH;

/// bcrypt work factor.
pub const BCRYPT_COST: u32 = 9;

/// Number of digits in a password reset code.
pub const RESET_CODE_LENGTH: usize = 6;

/// Password hashing and policy errors.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// bcrypt rejected the input or the stored hash.
    #[error("Password processing failed")]
    Hash(#[from] bcrypt::BcryptError),

    /// The blocking task panicked or was cancelled.
    #[error("Password task failed: {0}")]
    Task(String),

    /// Password does not satisfy the configured policy.
    #[error("{0}")]
    Policy(String),
}

/// Hash a password with bcrypt.
pub async fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let plaintext = plaintext.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, BCRYPT_COST))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
        .map_err(PasswordError::from)
}

/// Check a password against a stored bcrypt hash.
pub async fn verify_password(plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
    let plaintext = plaintext.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash))
        .await
        .map_err(|e| PasswordError::Task(e.to_string()))?
        .map_err(PasswordError::from)
}

/// Password strength rules.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl PasswordPolicy {
    #[must_use]
    pub const fn new(min_length: usize) -> Self {
        Self {
            min_length,
            max_length: PASSWORD_MAX_LENGTH,
        }
    }

    /// Require upper-case, lower-case and a digit within the length bounds.
    pub fn validate(&self, password: &str) -> Result<(), PasswordError> {
        let length = password.chars().count();
        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());

        if length < self.min_length
            || length > self.max_length
            || !has_upper
            || !has_lower
            || !has_digit
        {
            return Err(PasswordError::Policy(format!(
                "Password must be {}-{} characters and contain a capital letter, a lower-case letter and a number",
                self.min_length, self.max_length
            )));
        }
        Ok(())
    }
}

/// Generate a numeric password reset code.
#[must_use]
pub fn generate_reset_code() -> String {
    let mut rng = rand::thread_rng();
    (0..RESET_CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("Secret123").await.unwrap();
        assert!(hash.starts_with("$2b$09$"));
        assert!(verify_password("Secret123", &hash).await.unwrap());
        assert!(!verify_password("secret123", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_an_error() {
        let result = verify_password("Secret123", "not-a-hash").await;
        assert!(matches!(result, Err(PasswordError::Hash(_))));
    }

    #[test]
    fn test_policy() {
        let policy = PasswordPolicy::new(8);
        assert!(policy.validate("Secret123").is_ok());
        assert!(policy.validate("Sec123").is_err());
        assert!(policy.validate("secret123").is_err());
        assert!(policy.validate("SECRET123").is_err());
        assert!(policy.validate("SecretPass").is_err());
        assert!(policy.validate("Secret123456789012345").is_err());
    }

    #[test]
    fn test_policy_respects_configured_minimum() {
        let policy = PasswordPolicy::new(6);
        assert!(policy.validate("Sec123").is_ok());
        assert!(policy.validate("Se123").is_err());
    }

    #[test]
    fn test_reset_code_shape() {
        let code = generate_reset_code();
        assert_eq!(code.len(), RESET_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
