//! Cache invalidator.
//!
//! Drains the event queue, merges the batch into an [`InvalidationPlan`] and
//! evicts the affected explore entries from every tier.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::repos::TermsRepo;
use crate::domain::types::Taxonomy;

use super::config::CacheConfig;
use super::events::EventQueue;
use super::keys::ExploreKey;
use super::planner::{InvalidationPlan, StaleTerms};
use super::tiered::TieredCache;

const METRIC_INVALIDATE_MS: &str = "bizdir_cache_invalidate_ms";

/// Listener that turns directory change events into cache evictions.
pub struct CacheInvalidator {
    config: CacheConfig,
    cache: Arc<TieredCache>,
    queue: Arc<EventQueue>,
    terms: Arc<dyn TermsRepo>,
    /// Held from drain until the batch is evicted.
    in_flight: Mutex<()>,
}

impl CacheInvalidator {
    pub fn new(
        config: CacheConfig,
        cache: Arc<TieredCache>,
        queue: Arc<EventQueue>,
        terms: Arc<dyn TermsRepo>,
    ) -> Self {
        Self {
            config,
            cache,
            queue,
            terms,
            in_flight: Mutex::new(()),
        }
    }

    /// Consume one batch of pending events.
    ///
    /// Returns true if any events were processed. Waits for a batch another
    /// caller is still evicting, so an empty queue means every published
    /// event has been applied.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let _in_flight = self.in_flight.lock().await;
        let started_at = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit.max(1));
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let plan = InvalidationPlan::from_events(events);

        info!(
            event_count,
            event_ids = ?event_ids,
            plan = %plan,
            "Cache invalidation starting"
        );

        let evicted = self.execute(&plan).await;

        info!(event_count, evicted, "Cache invalidation complete");

        histogram!(
            METRIC_INVALIDATE_MS,
            "mode" => if plan.full_flush { "full" } else { "targeted" }
        )
        .record(started_at.elapsed().as_secs_f64() * 1000.0);

        true
    }

    /// Consume until the queue is empty.
    pub async fn consume_all(&self) -> usize {
        let mut batches = 0;
        while self.consume().await {
            batches += 1;
        }
        batches
    }

    /// Evict everything derived from any area or tag, bypassing the queue.
    #[instrument(skip(self))]
    pub async fn invalidate_all(&self) -> usize {
        self.flush(&BTreeSet::new(), &BTreeSet::new()).await
    }

    async fn execute(&self, plan: &InvalidationPlan) -> usize {
        if plan.is_empty() {
            return 0;
        }
        if plan.full_flush {
            return self.flush(&plan.removed_areas, &plan.removed_tags).await;
        }

        let mut areas = BTreeSet::new();
        let mut tags = BTreeSet::new();
        for (listing_id, stale) in &plan.listings {
            match self.current_terms(*listing_id).await {
                Ok(current) => {
                    areas.extend(current.areas);
                    tags.extend(current.tags);
                }
                Err(message) => {
                    warn!(
                        listing_id,
                        error = %message,
                        "Listing terms unavailable; falling back to full flush"
                    );
                    return self.flush(&BTreeSet::new(), &BTreeSet::new()).await;
                }
            }
            areas.extend(stale.areas.iter().cloned());
            tags.extend(stale.tags.iter().cloned());
        }

        self.evict_derived(&areas, &tags).await
    }

    async fn current_terms(&self, listing_id: i64) -> Result<StaleTerms, String> {
        let mut current = StaleTerms::default();
        for taxonomy in [Taxonomy::Area, Taxonomy::Tag] {
            let terms = self
                .terms
                .terms_for_listing(listing_id, taxonomy)
                .await
                .map_err(|err| err.to_string())?;
            let slugs = terms.into_iter().map(|term| term.slug);
            match taxonomy {
                Taxonomy::Area => current.areas.extend(slugs),
                _ => current.tags.extend(slugs),
            }
        }
        Ok(current)
    }

    async fn flush(
        &self,
        removed_areas: &BTreeSet<String>,
        removed_tags: &BTreeSet<String>,
    ) -> usize {
        let mut areas = removed_areas.clone();
        let mut tags = removed_tags.clone();

        match self.terms.list_term_slugs(Taxonomy::Area).await {
            Ok(slugs) => areas.extend(slugs),
            Err(err) => warn!(error = %err, "Failed to enumerate areas for flush"),
        }
        match self.terms.list_term_slugs(Taxonomy::Tag).await {
            Ok(slugs) => tags.extend(slugs),
            Err(err) => warn!(error = %err, "Failed to enumerate tags for flush"),
        }

        info!(areas = areas.len(), tags = tags.len(), "Flushing explore cache");
        self.evict_derived(&areas, &tags).await
    }

    async fn evict_derived(&self, areas: &BTreeSet<String>, tags: &BTreeSet<String>) -> usize {
        let mut keys: Vec<ExploreKey> = ExploreKey::global().into_iter().collect();
        for area in areas {
            keys.extend(ExploreKey::for_area(area));
            keys.extend(tags.iter().map(|tag| ExploreKey::intersection(area, tag)));
        }
        keys.extend(tags.iter().map(|tag| ExploreKey::for_tag(tag)));

        for key in &keys {
            self.cache.evict(key).await;
        }
        keys.len()
    }
}
