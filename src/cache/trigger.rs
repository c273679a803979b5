//! Cache trigger service.
//!
//! Write paths call into this after a successful mutation; it publishes the
//! matching event and, by default, runs the invalidator right away.

use std::sync::Arc;

use tracing::debug;

use super::config::CacheConfig;
use super::consumer::CacheInvalidator;
use super::events::{EventKind, EventQueue};
use crate::domain::types::{TermChange, Taxonomy};

pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<EventQueue>,
    invalidator: Arc<CacheInvalidator>,
}

impl CacheTrigger {
    pub fn new(
        config: CacheConfig,
        queue: Arc<EventQueue>,
        invalidator: Arc<CacheInvalidator>,
    ) -> Self {
        Self {
            config,
            queue,
            invalidator,
        }
    }

    /// Publish an event and optionally consume the queue immediately.
    ///
    /// Events left queued are picked up by the background consumer.
    pub async fn trigger(&self, kind: EventKind, consume_now: bool) {
        if !self.config.is_enabled() {
            debug!(event_kind = kind.label(), "Cache trigger skipped: cache disabled");
            return;
        }

        self.queue.publish(kind);

        if consume_now {
            self.invalidator.consume_all().await;
        }
    }

    pub async fn listing_saved(&self, listing_id: i64) {
        self.trigger(EventKind::ListingSaved { listing_id }, true).await;
    }

    pub async fn listing_trashed(&self, listing_id: i64) {
        self.trigger(EventKind::ListingTrashed { listing_id }, true).await;
    }

    pub async fn listing_untrashed(&self, listing_id: i64) {
        self.trigger(EventKind::ListingUntrashed { listing_id }, true).await;
    }

    pub async fn listing_deleted(&self, listing_id: i64) {
        self.trigger(EventKind::ListingDeleted { listing_id }, true).await;
    }

    pub async fn listing_terms_set(
        &self,
        listing_id: i64,
        taxonomy: Taxonomy,
        previous_slugs: Vec<String>,
    ) {
        self.trigger(
            EventKind::ListingTermsSet {
                listing_id,
                taxonomy,
                previous_slugs,
            },
            true,
        )
        .await;
    }

    pub async fn term_changed(&self, taxonomy: Taxonomy, slug: &str, change: TermChange) {
        self.trigger(
            EventKind::TermChanged {
                taxonomy,
                slug: slug.to_string(),
                change,
            },
            true,
        )
        .await;
    }

    pub async fn flush(&self) {
        self.trigger(EventKind::FlushRequested, true).await;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn invalidator(&self) -> &Arc<CacheInvalidator> {
        &self.invalidator
    }
}
