//! Invalidation plan generation.
//!
//! Merges a batch of queued events into the set of listings whose explore
//! entries must be refreshed, or a single full flush.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use super::events::{CacheEvent, EventKind};
use crate::domain::types::{TermChange, Taxonomy};

/// Term slugs a listing belonged to before a write replaced them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StaleTerms {
    pub areas: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

impl StaleTerms {
    fn record(&mut self, taxonomy: Taxonomy, slugs: &[String]) {
        let target = match taxonomy {
            Taxonomy::Area => &mut self.areas,
            Taxonomy::Tag => &mut self.tags,
            Taxonomy::Category => return,
        };
        target.extend(slugs.iter().cloned());
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Re-enumerate every area and tag and evict everything derived from them.
    pub full_flush: bool,
    /// Slugs of deleted terms; they no longer enumerate but may still be cached.
    pub removed_areas: BTreeSet<String>,
    pub removed_tags: BTreeSet<String>,
    /// Listings whose current terms drive targeted eviction.
    pub listings: BTreeMap<i64, StaleTerms>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ full_flush: {}, listings: {}, removed_areas: {}, removed_tags: {} }}",
            self.full_flush,
            self.listings.len(),
            self.removed_areas.len(),
            self.removed_tags.len(),
        )
    }
}

impl InvalidationPlan {
    /// Merge events, dropping repeated event ids.
    ///
    /// Listing deletion, structural term changes and explicit flushes force a
    /// full flush, which makes the targeted work redundant.
    pub fn from_events(events: Vec<CacheEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        for event in events.into_iter().filter(|e| seen_ids.insert(e.id)) {
            match event.kind {
                EventKind::ListingSaved { listing_id }
                | EventKind::ListingTrashed { listing_id }
                | EventKind::ListingUntrashed { listing_id } => {
                    plan.listings.entry(listing_id).or_default();
                }
                EventKind::ListingTermsSet {
                    listing_id,
                    taxonomy,
                    previous_slugs,
                } => {
                    plan.listings
                        .entry(listing_id)
                        .or_default()
                        .record(taxonomy, &previous_slugs);
                }
                EventKind::ListingDeleted { .. } | EventKind::FlushRequested => {
                    plan.full_flush = true;
                }
                EventKind::TermChanged {
                    taxonomy,
                    slug,
                    change,
                } => {
                    if !taxonomy.is_explore_structure() {
                        continue;
                    }
                    plan.full_flush = true;
                    if change == TermChange::Deleted {
                        match taxonomy {
                            Taxonomy::Area => plan.removed_areas.insert(slug),
                            Taxonomy::Tag => plan.removed_tags.insert(slug),
                            Taxonomy::Category => false,
                        };
                    }
                }
            }
        }

        if plan.full_flush {
            plan.listings.clear();
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        !self.full_flush && self.listings.is_empty()
    }
}
