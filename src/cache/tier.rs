//! Cache tiers.
//!
//! A tier maps an [`ExploreKey`] to its own key space (or declines it) and
//! stores JSON values. Failures inside a tier are logged and read as misses;
//! callers never see them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::keys::ExploreKey;
use super::persistent::TransientStore;
use super::store::ObjectStore;

#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Key for `key` in this tier, or `None` if the tier does not hold it.
    fn key_for(&self, key: &ExploreKey) -> Option<String>;

    async fn load(&self, key: &str) -> Option<Value>;

    async fn store(&self, key: &str, value: Value, ttl: Duration);

    async fn evict(&self, key: &str);
}

/// Fast, process-local tier.
pub struct ObjectTier {
    store: Arc<ObjectStore>,
}

impl ObjectTier {
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CacheTier for ObjectTier {
    fn name(&self) -> &'static str {
        "object"
    }

    fn key_for(&self, key: &ExploreKey) -> Option<String> {
        key.object_key()
    }

    async fn load(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    async fn store(&self, key: &str, value: Value, ttl: Duration) {
        self.store.set(key, value, ttl);
    }

    async fn evict(&self, key: &str) {
        self.store.remove(key);
    }
}

/// Durable tier backed by a [`TransientStore`].
pub struct PersistentTier {
    store: Arc<dyn TransientStore>,
}

impl PersistentTier {
    pub fn new(store: Arc<dyn TransientStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CacheTier for PersistentTier {
    fn name(&self) -> &'static str {
        "persistent"
    }

    fn key_for(&self, key: &ExploreKey) -> Option<String> {
        key.transient_key()
    }

    async fn load(&self, key: &str) -> Option<Value> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "Transient read failed; treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &str, value: Value, ttl: Duration) {
        if let Err(err) = self.store.set(key, &value, ttl).await {
            warn!(key, error = %err, "Transient write failed");
        }
    }

    async fn evict(&self, key: &str) {
        if let Err(err) = self.store.delete(key).await {
            warn!(key, error = %err, "Transient delete failed");
        }
    }
}
