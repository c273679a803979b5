//! Directory change events.
//!
//! Write paths publish what changed; the invalidator drains the queue and
//! decides which explore entries are stale.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::gauge;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::lock::mutex_lock;
use crate::domain::types::{TermChange, Taxonomy};

const SOURCE: &str = "cache::events";
const METRIC_QUEUE_LEN: &str = "bizdir_cache_event_queue_len";

/// Monotonic publish order within this process.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct CacheEvent {
    /// Used to drop duplicates within a batch.
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A listing was created or its fields changed.
    ListingSaved { listing_id: i64 },
    ListingTrashed { listing_id: i64 },
    ListingUntrashed { listing_id: i64 },
    /// A listing was removed for good; its terms are no longer readable.
    ListingDeleted { listing_id: i64 },
    /// A listing's terms in one taxonomy were replaced.
    ///
    /// `previous_slugs` carries the assignments before the write so entries
    /// for terms the listing left are refreshed too.
    ListingTermsSet {
        listing_id: i64,
        taxonomy: Taxonomy,
        previous_slugs: Vec<String>,
    },
    TermChanged {
        taxonomy: Taxonomy,
        slug: String,
        change: TermChange,
    },
    /// Operator asked for everything to be rebuilt.
    FlushRequested,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ListingSaved { .. } => "listing_saved",
            Self::ListingTrashed { .. } => "listing_trashed",
            Self::ListingUntrashed { .. } => "listing_untrashed",
            Self::ListingDeleted { .. } => "listing_deleted",
            Self::ListingTermsSet { .. } => "listing_terms_set",
            Self::TermChanged { .. } => "term_changed",
            Self::FlushRequested => "flush_requested",
        }
    }
}

/// FIFO of pending events shared by publishers and the invalidator.
pub struct EventQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, kind: EventKind) -> Uuid {
        let event = CacheEvent::new(kind, self.next_epoch());
        let id = event.id;
        self.push(event);
        id
    }

    /// Enqueue an already-built event, keeping its id.
    pub fn push(&self, event: CacheEvent) {
        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = event.kind.label(),
            "Cache event enqueued"
        );

        let mut queue = mutex_lock(&self.queue, SOURCE, "publish");
        queue.push_back(event);
        gauge!(METRIC_QUEUE_LEN).set(queue.len() as f64);
    }

    /// Up to `limit` events in publish order.
    pub fn drain(&self, limit: usize) -> Vec<CacheEvent> {
        let mut queue = mutex_lock(&self.queue, SOURCE, "drain");
        let count = limit.min(queue.len());
        let drained: Vec<CacheEvent> = queue.drain(..count).collect();
        gauge!(METRIC_QUEUE_LEN).set(queue.len() as f64);
        drained
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.queue, SOURCE, "clear").clear();
        gauge!(METRIC_QUEUE_LEN).set(0.0);
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
