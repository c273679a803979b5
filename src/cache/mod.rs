//! Explore cache.
//!
//! Two tiers sit in front of the explore aggregates:
//!
//! - **Object tier**: in-process LRU of JSON values
//! - **Persistent tier**: transient rows shared across processes
//!
//! [`TieredCache`] walks them in order and recomputes on a full miss. Writes
//! to the directory publish [`EventKind`]s that the [`CacheInvalidator`]
//! turns into evictions. Every entry also expires after `cache_ttl_seconds`.
//!
//! ```toml
//! [cache]
//! enable_object_tier = true
//! enable_persistent_tier = true
//! object_tier_capacity = 2048
//! ```

mod config;
mod consumer;
mod events;
mod keys;
mod lock;
mod persistent;
mod planner;
mod store;
mod tier;
mod tiered;
mod trigger;

pub use config::{CacheConfig, MAX_ENTRY_TTL_SECS};
pub use consumer::CacheInvalidator;
pub use events::{CacheEvent, Epoch, EventKind, EventQueue};
pub use keys::{ExploreKey, transient_suffix};
pub use persistent::{MemoryTransientStore, TransientError, TransientStore};
pub use planner::{InvalidationPlan, StaleTerms};
pub use store::ObjectStore;
pub use tier::{CacheTier, ObjectTier, PersistentTier};
pub use tiered::TieredCache;
pub use trigger::CacheTrigger;
