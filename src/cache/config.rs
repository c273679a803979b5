//! Cache configuration.
//!
//! Controls the object tier, the persistent tier and invalidation cadence via
//! the `[cache]` and `[explore]` sections of `bizdir.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_OBJECT_TIER_CAPACITY: usize = 2048;
const DEFAULT_ENTRY_TTL_SECS: u64 = 3600;
const DEFAULT_AUTO_CONSUME_INTERVAL_MS: u64 = 5000;
const DEFAULT_CONSUME_BATCH_LIMIT: usize = 100;

/// Longest lifetime either tier will hold an entry for.
pub const MAX_ENTRY_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the in-process object tier.
    pub enable_object_tier: bool,
    /// Enable the persistent transient tier.
    pub enable_persistent_tier: bool,
    /// Maximum entries held by the object tier.
    pub object_tier_capacity: usize,
    /// Lifetime of every entry in both tiers, in seconds.
    pub entry_ttl_secs: u64,
    /// Auto-consume interval (ms) for queued invalidation events.
    pub auto_consume_interval_ms: u64,
    /// Maximum events per consumption batch.
    pub consume_batch_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_object_tier: true,
            enable_persistent_tier: true,
            object_tier_capacity: DEFAULT_OBJECT_TIER_CAPACITY,
            entry_ttl_secs: DEFAULT_ENTRY_TTL_SECS,
            auto_consume_interval_ms: DEFAULT_AUTO_CONSUME_INTERVAL_MS,
            consume_batch_limit: DEFAULT_CONSUME_BATCH_LIMIT,
        }
    }
}

impl From<&crate::config::Settings> for CacheConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            enable_object_tier: settings.cache.enable_object_tier,
            enable_persistent_tier: settings.cache.enable_persistent_tier,
            object_tier_capacity: settings.cache.object_tier_capacity,
            entry_ttl_secs: settings.explore.cache_ttl.as_secs(),
            auto_consume_interval_ms: settings.cache.auto_consume_interval_ms,
            consume_batch_limit: settings.cache.consume_batch_limit,
        }
    }
}

impl CacheConfig {
    /// Returns true if any cache tier is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enable_object_tier || self.enable_persistent_tier
    }

    /// Returns the object tier capacity, clamping to 1 if zero.
    pub fn object_tier_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.object_tier_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_ttl_secs.min(MAX_ENTRY_TTL_SECS))
    }

    pub fn auto_consume_interval(&self) -> Duration {
        Duration::from_millis(self.auto_consume_interval_ms.max(1))
    }
}
