//! Ordered fallback over cache tiers.
//!
//! Reads walk the tiers fastest first and fall back to recomputation. A hit in
//! a slower tier back-fills the faster ones; a recomputed value is written to
//! every tier that holds the key.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::config::{CacheConfig, MAX_ENTRY_TTL_SECS};
use super::keys::ExploreKey;
use super::persistent::TransientStore;
use super::store::ObjectStore;
use super::tier::{CacheTier, ObjectTier, PersistentTier};

const METRIC_HIT: &str = "bizdir_cache_hit_total";
const METRIC_MISS: &str = "bizdir_cache_miss_total";
const METRIC_EVICT: &str = "bizdir_cache_evict_total";

pub struct TieredCache {
    tiers: Vec<Arc<dyn CacheTier>>,
    ttl: Duration,
}

impl TieredCache {
    /// A cache with no tiers; every read recomputes.
    pub fn new(ttl: Duration) -> Self {
        Self {
            tiers: Vec::new(),
            ttl: ttl.min(Duration::from_secs(MAX_ENTRY_TTL_SECS)),
        }
    }

    /// Append a tier after the existing (faster) ones.
    pub fn with_tier(mut self, tier: Arc<dyn CacheTier>) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Object tier then persistent tier, each only when enabled and supplied.
    pub fn from_config(
        config: &CacheConfig,
        object: Option<Arc<ObjectStore>>,
        persistent: Option<Arc<dyn TransientStore>>,
    ) -> Self {
        let mut cache = Self::new(config.entry_ttl());
        if config.enable_object_tier
            && let Some(store) = object
        {
            cache = cache.with_tier(Arc::new(ObjectTier::new(store)));
        }
        if config.enable_persistent_tier
            && let Some(store) = persistent
        {
            cache = cache.with_tier(Arc::new(PersistentTier::new(store)));
        }
        cache
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|tier| tier.name()).collect()
    }

    /// Cached value for `key`, computing and storing it on a full miss.
    ///
    /// Errors from `compute` propagate and nothing is stored.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &ExploreKey, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        for (index, tier) in self.tiers.iter().enumerate() {
            let Some(tier_key) = tier.key_for(key) else {
                continue;
            };

            let Some(raw) = tier.load(&tier_key).await else {
                counter!(METRIC_MISS, "tier" => tier.name(), "kind" => key.kind()).increment(1);
                continue;
            };

            match serde_json::from_value::<T>(raw.clone()) {
                Ok(value) => {
                    counter!(METRIC_HIT, "tier" => tier.name(), "kind" => key.kind()).increment(1);
                    self.backfill(&self.tiers[..index], key, raw).await;
                    return Ok(value);
                }
                Err(err) => {
                    warn!(
                        key = %tier_key,
                        tier = tier.name(),
                        error = %err,
                        "Discarding undecodable cache entry"
                    );
                    tier.evict(&tier_key).await;
                }
            }
        }

        let value = compute().await?;

        match serde_json::to_value(&value) {
            Ok(raw) => self.backfill(&self.tiers, key, raw).await,
            Err(err) => warn!(kind = key.kind(), error = %err, "Computed value is not cacheable"),
        }

        Ok(value)
    }

    /// Remove `key` from every tier that holds it.
    pub async fn evict(&self, key: &ExploreKey) {
        for tier in &self.tiers {
            if let Some(tier_key) = tier.key_for(key) {
                tier.evict(&tier_key).await;
                counter!(METRIC_EVICT, "tier" => tier.name(), "kind" => key.kind()).increment(1);
            }
        }
        debug!(kind = key.kind(), ?key, "Cache entry evicted");
    }

    async fn backfill(&self, tiers: &[Arc<dyn CacheTier>], key: &ExploreKey, raw: Value) {
        for tier in tiers {
            if let Some(tier_key) = tier.key_for(key) {
                tier.store(&tier_key, raw.clone(), self.ttl).await;
            }
        }
    }
}
