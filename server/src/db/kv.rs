//! Key-Value Store
//!
//! Minimal string key-value interface with expiry, backed by Redis in
//! production (`RedisKv`) and by a `DashMap` in tests (`MemoryKv`).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use fred::prelude::*;
use futures::TryStreamExt;
use thiserror::Error;

/// Key-value store errors.
#[derive(Debug, Error)]
pub enum KvError {
    /// Redis command failed.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    /// Expiry must be a positive number of seconds.
    #[error("Expiry must be a positive number of seconds")]
    InvalidExpiry,

    /// The store could not be reached.
    #[error("Key-value store unavailable")]
    Unavailable,
}

/// Result type for key-value operations.
pub type KvResult<T> = Result<T, KvError>;

/// String key-value store with optional expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> KvResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> KvResult<()>;
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<()>;

    /// Remove a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> KvResult<bool>;

    /// List keys matching a glob pattern (`*` wildcard).
    async fn keys_by_pattern(&self, pattern: &str) -> KvResult<Vec<String>>;

    /// Remove every key starting with `prefix`. Returns how many were removed.
    async fn delete_by_prefix(&self, prefix: &str) -> KvResult<usize> {
        let keys = self.keys_by_pattern(&format!("{prefix}*")).await?;
        let mut removed = 0;
        for key in keys {
            if self.delete(&key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

// ============================================================================
// Redis
// ============================================================================

/// Redis-backed key-value store.
#[derive(Clone)]
pub struct RedisKv {
    client: Client,
}

impl RedisKv {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl KeyValueStore for RedisKv {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.client.get::<Option<String>, _>(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.client
            .set::<(), _, _>(key, value, None, None, false)
            .await?;
        Ok(())
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<()> {
        let ttl = i64::try_from(ttl_seconds).map_err(|_| KvError::InvalidExpiry)?;
        if ttl <= 0 {
            return Err(KvError::InvalidExpiry);
        }

        self.client
            .set::<(), _, _>(key, value, Some(Expiration::EX(ttl)), None, false)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        let deleted: i64 = self.client.del(key).await?;
        Ok(deleted > 0)
    }

    async fn keys_by_pattern(&self, pattern: &str) -> KvResult<Vec<String>> {
        let keys: Vec<Key> = self
            .client
            .scan_buffered(pattern, Some(100), None)
            .try_collect()
            .await?;

        Ok(keys
            .iter()
            .filter_map(|k| k.as_str().map(str::to_owned))
            .collect())
    }
}

// ============================================================================
// Memory
// ============================================================================

/// In-process key-value store with lazy expiry.
#[derive(Default)]
pub struct MemoryKv {
    entries: DashMap<String, (String, Option<Instant>)>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining time-to-live of a key, if it has one and is still live.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.entries
            .get(key)
            .and_then(|entry| entry.value().1)
            .and_then(|deadline| deadline.checked_duration_since(Instant::now()))
    }

    /// Drop `key` if it has expired. The deadline is re-checked under the
    /// shard lock, so a value written concurrently is never removed.
    fn reap_expired(&self, key: &str) {
        self.entries
            .remove_if(key, |_, (_, deadline)| is_expired(*deadline));
    }

    fn live_value(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            let (value, deadline) = entry.value();
            if !is_expired(*deadline) {
                return Some(value.clone());
            }
        }
        self.reap_expired(key);
        None
    }
}

fn is_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| deadline <= Instant::now())
}

/// Glob match supporting only the `*` wildcard.
fn glob_match(pattern: &str, candidate: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return candidate.is_empty();
    };
    let Some(mut rest) = candidate.strip_prefix(first) else {
        return false;
    };

    let remaining: Vec<&str> = parts.collect();
    let Some((last, middle)) = remaining.split_last() else {
        // No wildcard in the pattern: exact match required.
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.entries
            .insert(key.to_string(), (value.to_string(), None));
        Ok(())
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<()> {
        if ttl_seconds == 0 {
            return Err(KvError::InvalidExpiry);
        }
        let deadline = Instant::now() + Duration::from_secs(ttl_seconds);
        self.entries
            .insert(key.to_string(), (value.to_string(), Some(deadline)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, (_, deadline))| !is_expired(deadline)))
    }

    async fn keys_by_pattern(&self, pattern: &str) -> KvResult<Vec<String>> {
        let candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        Ok(candidates
            .into_iter()
            .filter(|key| self.live_value(key).is_some())
            .collect())
    }
}
