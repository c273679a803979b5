//! Persistent transient tier.
//!
//! Survives process restarts and is shared between processes. Postgres backs
//! it in production (`infra::db::PgTransientStore`); the in-memory store is
//! used when no database is attached.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::config::MAX_ENTRY_TTL_SECS;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::persistent";

#[derive(Debug, Error)]
pub enum TransientError {
    #[error("transient backend error: {0}")]
    Backend(String),
}

impl TransientError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Key/value store with expiry, addressed by the `bd_*` transient keys.
#[async_trait]
pub trait TransientStore: Send + Sync {
    /// Live value for `key`; expired rows read as missing.
    async fn get(&self, key: &str) -> Result<Option<Value>, TransientError>;

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), TransientError>;

    async fn delete(&self, key: &str) -> Result<(), TransientError>;
}

/// Process-local transient store.
#[derive(Default)]
pub struct MemoryTransientStore {
    entries: Mutex<HashMap<String, (Value, Instant)>>,
}

impl MemoryTransientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        mutex_lock(&self.entries, SOURCE, "contains")
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at > Instant::now())
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TransientStore for MemoryTransientStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, TransientError> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        let live = entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone());
        if live.is_none() {
            entries.remove(key);
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), TransientError> {
        let expires_at = Instant::now() + ttl.min(Duration::from_secs(MAX_ENTRY_TTL_SECS));
        mutex_lock(&self.entries, SOURCE, "set")
            .insert(key.to_string(), (value.clone(), expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TransientError> {
        mutex_lock(&self.entries, SOURCE, "delete").remove(key);
        Ok(())
    }
}
