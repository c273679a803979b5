//! In-memory directory used by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime, macros::datetime};

use bizdir::application::loader::{ExploreLoader, ExploreRepositories, LoaderOptions};
use bizdir::application::repos::{
    CreateTermParams, EditorialRepo, ExploreRepo, FeaturedRepo, GeoRow, IntersectionRow,
    ListingQuery, ListingSlice, ListingsRepo, RepoError, TermCount, TermsRepo, TermsWriteRepo,
    UpsertListingParams,
};
use bizdir::cache::{MemoryTransientStore, TransientStore};
use bizdir::domain::entities::{
    Contact, IntroTarget, ListingRecord, ListingTermRecord, Location, TermRecord,
};
use bizdir::domain::types::{ListingStatus, SortKey, Taxonomy};

pub const SITE: &str = "https://dir.example";

const EPOCH: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);

#[derive(Default)]
struct State {
    listings: BTreeMap<i64, ListingRecord>,
    before_trash: HashMap<i64, ListingStatus>,
    terms: BTreeMap<i64, TermRecord>,
    memberships: BTreeSet<(i64, i64)>,
    featured: Vec<i64>,
    intros: HashMap<IntroTarget, String>,
    next_listing: i64,
    next_term: i64,
    clock: i64,
}

impl State {
    fn tick(&mut self) -> OffsetDateTime {
        self.clock += 1;
        EPOCH + Duration::seconds(self.clock)
    }

    fn term_by_slug(&self, taxonomy: Taxonomy, slug: &str) -> Option<&TermRecord> {
        self.terms
            .values()
            .find(|term| term.taxonomy == taxonomy && term.slug == slug)
    }

    fn terms_of(&self, listing_id: i64, taxonomy: Taxonomy) -> Vec<TermRecord> {
        self.memberships
            .iter()
            .filter(|(listing, _)| *listing == listing_id)
            .filter_map(|(_, term_id)| self.terms.get(term_id))
            .filter(|term| term.taxonomy == taxonomy)
            .cloned()
            .collect()
    }

    fn has_term(&self, listing_id: i64, taxonomy: Taxonomy, slug: &str) -> bool {
        self.terms_of(listing_id, taxonomy)
            .iter()
            .any(|term| term.slug == slug)
    }

    fn published(&self) -> impl Iterator<Item = &ListingRecord> {
        self.listings
            .values()
            .filter(|listing| listing.status == ListingStatus::Publish)
    }

    /// Published listings grouped by a term of `group` among those carrying `filter`.
    fn grouped_counts(
        &self,
        filter: (Taxonomy, &str),
        group: Taxonomy,
        min_count: u64,
    ) -> Vec<TermCount> {
        let mut counts: BTreeMap<i64, (TermRecord, u64)> = BTreeMap::new();
        for listing in self.published() {
            if !self.has_term(listing.id, filter.0, filter.1) {
                continue;
            }
            for term in self.terms_of(listing.id, group) {
                counts.entry(term.id).or_insert((term, 0)).1 += 1;
            }
        }
        counts
            .into_values()
            .filter(|(_, count)| *count >= min_count)
            .map(|(term, count)| TermCount {
                term_id: term.id,
                slug: term.slug,
                name: term.name,
                count,
            })
            .collect()
    }
}

/// Call counters for asserting on query shape.
#[derive(Default)]
pub struct Calls {
    pub tags_for_area: AtomicUsize,
    pub list_listings: AtomicUsize,
    pub geo_batches: AtomicUsize,
    pub term_batches: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MemoryDirectory {
    state: Mutex<State>,
    pub calls: Calls,
}

impl MemoryDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("directory state lock")
    }

    pub fn term(&self, taxonomy: Taxonomy, slug: &str) -> i64 {
        let mut state = self.state();
        if let Some(term) = state.term_by_slug(taxonomy, slug) {
            return term.id;
        }
        state.next_term += 1;
        let id = state.next_term;
        let name = slug
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        state.terms.insert(
            id,
            TermRecord {
                id,
                taxonomy,
                slug: slug.to_string(),
                name,
            },
        );
        id
    }

    pub fn listing(&self, slug: &str) -> ListingSeed<'_> {
        ListingSeed {
            directory: self,
            slug: slug.to_string(),
            title: None,
            status: ListingStatus::Publish,
            rating: None,
            reviews: None,
            location: None,
            areas: Vec::new(),
            tags: Vec::new(),
            categories: Vec::new(),
        }
    }

    pub fn set_featured(&self, ids: &[i64]) {
        self.state().featured = ids.to_vec();
    }

    pub fn status_of(&self, id: i64) -> Option<ListingStatus> {
        self.state().listings.get(&id).map(|listing| listing.status)
    }

    /// Change a listing's terms behind the cache's back.
    pub fn detach(&self, listing_id: i64, taxonomy: Taxonomy, slug: &str) {
        let mut state = self.state();
        let Some(term_id) = state.term_by_slug(taxonomy, slug).map(|term| term.id) else {
            return;
        };
        state.memberships.remove(&(listing_id, term_id));
    }
}

pub struct ListingSeed<'a> {
    directory: &'a MemoryDirectory,
    slug: String,
    title: Option<String>,
    status: ListingStatus,
    rating: Option<f64>,
    reviews: Option<i32>,
    location: Option<(f64, f64)>,
    areas: Vec<String>,
    tags: Vec<String>,
    categories: Vec<String>,
}

impl ListingSeed<'_> {
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn draft(mut self) -> Self {
        self.status = ListingStatus::Draft;
        self
    }

    pub fn rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn reviews(mut self, reviews: i32) -> Self {
        self.reviews = Some(reviews);
        self
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some((lat, lng));
        self
    }

    pub fn area(mut self, slug: &str) -> Self {
        self.areas.push(slug.to_string());
        self
    }

    pub fn tag(mut self, slug: &str) -> Self {
        self.tags.push(slug.to_string());
        self
    }

    pub fn category(mut self, slug: &str) -> Self {
        self.categories.push(slug.to_string());
        self
    }

    pub fn insert(self) -> i64 {
        let mut term_ids = Vec::new();
        for (taxonomy, slugs) in [
            (Taxonomy::Area, &self.areas),
            (Taxonomy::Tag, &self.tags),
            (Taxonomy::Category, &self.categories),
        ] {
            for slug in slugs {
                term_ids.push(self.directory.term(taxonomy, slug));
            }
        }

        let mut state = self.directory.state();
        state.next_listing += 1;
        let id = state.next_listing;
        let now = state.tick();
        let record = ListingRecord {
            id,
            title: self.title.unwrap_or_else(|| self.slug.clone()),
            slug: self.slug,
            excerpt: String::new(),
            body: String::new(),
            status: self.status,
            location: self.location.map(|(lat, lng)| Location {
                lat,
                lng,
                ..Location::default()
            }),
            contact: Contact::default(),
            opening_hours: serde_json::json!({}),
            avg_rating: self.rating,
            review_count: self.reviews,
            price_level: None,
            featured_image: None,
            published_at: (self.status == ListingStatus::Publish).then_some(now),
            created_at: now,
            modified_at: now,
        };
        state.listings.insert(id, record);
        for term_id in term_ids {
            state.memberships.insert((id, term_id));
        }
        id
    }
}

#[async_trait]
impl ExploreRepo for MemoryDirectory {
    async fn tags_for_area(
        &self,
        area_slug: &str,
        min_count: u64,
    ) -> Result<Vec<TermCount>, RepoError> {
        self.calls.tags_for_area.fetch_add(1, Ordering::SeqCst);
        let mut counts =
            self.state()
                .grouped_counts((Taxonomy::Area, area_slug), Taxonomy::Tag, min_count);
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        Ok(counts)
    }

    async fn areas_for_tag(
        &self,
        tag_slug: &str,
        min_count: u64,
    ) -> Result<Vec<TermCount>, RepoError> {
        let mut counts =
            self.state()
                .grouped_counts((Taxonomy::Tag, tag_slug), Taxonomy::Area, min_count);
        counts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(counts)
    }

    async fn count_intersection(&self, area_slug: &str, tag_slug: &str) -> Result<u64, RepoError> {
        let state = self.state();
        let count = state
            .published()
            .filter(|listing| state.has_term(listing.id, Taxonomy::Area, area_slug))
            .filter(|listing| state.has_term(listing.id, Taxonomy::Tag, tag_slug))
            .count();
        Ok(count as u64)
    }

    async fn sum_area_reviews(&self, area_slug: &str) -> Result<u64, RepoError> {
        let state = self.state();
        let total: i64 = state
            .published()
            .filter(|listing| state.has_term(listing.id, Taxonomy::Area, area_slug))
            .map(|listing| i64::from(listing.review_count.unwrap_or(0)))
            .sum();
        Ok(total.max(0) as u64)
    }

    async fn list_populated_areas(&self) -> Result<Vec<TermCount>, RepoError> {
        let state = self.state();
        let mut counts: BTreeMap<i64, (TermRecord, u64)> = BTreeMap::new();
        for listing in state.published() {
            for term in state.terms_of(listing.id, Taxonomy::Area) {
                counts.entry(term.id).or_insert((term, 0)).1 += 1;
            }
        }
        let mut areas: Vec<TermCount> = counts
            .into_values()
            .map(|(term, count)| TermCount {
                term_id: term.id,
                slug: term.slug,
                name: term.name,
                count,
            })
            .collect();
        areas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(areas)
    }

    async fn list_listings(&self, query: &ListingQuery) -> Result<ListingSlice, RepoError> {
        self.calls.list_listings.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        let mut matched: Vec<ListingRecord> = state
            .published()
            .filter(|listing| state.has_term(listing.id, Taxonomy::Area, &query.area_slug))
            .filter(|listing| match query.tag_slug.as_deref() {
                Some(tag) => state.has_term(listing.id, Taxonomy::Tag, tag),
                None => true,
            })
            .cloned()
            .collect();

        let position = |id: i64| {
            query
                .featured
                .iter()
                .position(|featured| *featured == id)
                .unwrap_or(usize::MAX)
        };
        matched.sort_by(|a, b| {
            let primary = match query.sort {
                SortKey::Rating => a
                    .avg_rating
                    .is_none()
                    .cmp(&b.avg_rating.is_none())
                    .then_with(|| {
                        b.avg_rating
                            .unwrap_or(0.0)
                            .total_cmp(&a.avg_rating.unwrap_or(0.0))
                    })
                    .then_with(|| a.title.cmp(&b.title)),
                SortKey::Reviews => a
                    .review_count
                    .is_none()
                    .cmp(&b.review_count.is_none())
                    .then_with(|| b.review_count.cmp(&a.review_count))
                    .then_with(|| a.title.cmp(&b.title)),
                SortKey::Newest => b.published_at.cmp(&a.published_at),
                SortKey::Name => a.title.cmp(&b.title),
                SortKey::Featured => position(a.id)
                    .cmp(&position(b.id))
                    .then_with(|| a.title.cmp(&b.title)),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok(ListingSlice { items, total })
    }

    async fn list_intersections(&self, min_count: u64) -> Result<Vec<IntersectionRow>, RepoError> {
        let state = self.state();
        let mut groups: BTreeMap<(String, String), (u64, Option<OffsetDateTime>)> =
            BTreeMap::new();
        for listing in state.published() {
            for area in state.terms_of(listing.id, Taxonomy::Area) {
                for tag in state.terms_of(listing.id, Taxonomy::Tag) {
                    let entry = groups
                        .entry((area.slug.clone(), tag.slug.clone()))
                        .or_insert((0, None));
                    entry.0 += 1;
                    entry.1 = entry.1.max(Some(listing.modified_at));
                }
            }
        }
        let mut rows: Vec<IntersectionRow> = groups
            .into_iter()
            .filter(|(_, (count, _))| *count >= min_count)
            .map(|((area_slug, tag_slug), (count, lastmod))| IntersectionRow {
                area_slug,
                tag_slug,
                count,
                lastmod,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.area_slug
                .cmp(&b.area_slug)
                .then_with(|| b.count.cmp(&a.count))
                .then_with(|| a.tag_slug.cmp(&b.tag_slug))
        });
        Ok(rows)
    }

    async fn geo_batch(&self, offset: u64, limit: u32) -> Result<Vec<GeoRow>, RepoError> {
        self.calls.geo_batches.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        Ok(state
            .published()
            .filter(|listing| listing.location.is_some())
            .skip(offset as usize)
            .take(limit as usize)
            .map(|listing| GeoRow {
                listing_id: listing.id,
                slug: listing.slug.clone(),
                lat: listing.location.as_ref().map(|loc| loc.lat),
                lng: listing.location.as_ref().map(|loc| loc.lng),
                modified_at: listing.modified_at,
            })
            .collect())
    }
}

#[async_trait]
impl TermsRepo for MemoryDirectory {
    async fn find_term(
        &self,
        taxonomy: Taxonomy,
        slug: &str,
    ) -> Result<Option<TermRecord>, RepoError> {
        Ok(self.state().term_by_slug(taxonomy, slug).cloned())
    }

    async fn find_term_by_id(&self, id: i64) -> Result<Option<TermRecord>, RepoError> {
        Ok(self.state().terms.get(&id).cloned())
    }

    async fn list_term_slugs(&self, taxonomy: Taxonomy) -> Result<Vec<String>, RepoError> {
        let mut slugs: Vec<String> = self
            .state()
            .terms
            .values()
            .filter(|term| term.taxonomy == taxonomy)
            .map(|term| term.slug.clone())
            .collect();
        slugs.sort();
        Ok(slugs)
    }

    async fn terms_for_listing(
        &self,
        listing_id: i64,
        taxonomy: Taxonomy,
    ) -> Result<Vec<TermRecord>, RepoError> {
        Ok(self.state().terms_of(listing_id, taxonomy))
    }

    async fn terms_for_listings(
        &self,
        listing_ids: &[i64],
    ) -> Result<Vec<ListingTermRecord>, RepoError> {
        self.calls.term_batches.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        Ok(state
            .memberships
            .iter()
            .filter(|(listing, _)| listing_ids.contains(listing))
            .filter_map(|(listing, term_id)| {
                state.terms.get(term_id).map(|term| ListingTermRecord {
                    listing_id: *listing,
                    term: term.clone(),
                })
            })
            .collect())
    }
}

#[async_trait]
impl TermsWriteRepo for MemoryDirectory {
    async fn create_term(&self, params: CreateTermParams) -> Result<TermRecord, RepoError> {
        let mut state = self.state();
        if state.term_by_slug(params.taxonomy, &params.slug).is_some() {
            return Err(RepoError::Duplicate {
                constraint: "terms_taxonomy_slug_key".to_string(),
            });
        }
        state.next_term += 1;
        let term = TermRecord {
            id: state.next_term,
            taxonomy: params.taxonomy,
            slug: params.slug,
            name: params.name,
        };
        state.terms.insert(term.id, term.clone());
        Ok(term)
    }

    async fn rename_term(&self, id: i64, name: &str) -> Result<TermRecord, RepoError> {
        let mut state = self.state();
        let term = state.terms.get_mut(&id).ok_or(RepoError::NotFound)?;
        term.name = name.to_string();
        Ok(term.clone())
    }

    async fn delete_term(&self, id: i64) -> Result<TermRecord, RepoError> {
        let mut state = self.state();
        let term = state.terms.remove(&id).ok_or(RepoError::NotFound)?;
        state.memberships.retain(|(_, term_id)| *term_id != id);
        Ok(term)
    }
}

#[async_trait]
impl ListingsRepo for MemoryDirectory {
    async fn find_listing(&self, id: i64) -> Result<Option<ListingRecord>, RepoError> {
        Ok(self.state().listings.get(&id).cloned())
    }

    async fn upsert_listing(
        &self,
        params: UpsertListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let mut state = self.state();
        let now = state.tick();
        let id = match params.id {
            Some(id) if state.listings.contains_key(&id) => id,
            Some(_) => return Err(RepoError::NotFound),
            None => {
                state.next_listing += 1;
                state.next_listing
            }
        };
        let previous = state.listings.get(&id).cloned();
        let published_at = params
            .published_at
            .or(previous.as_ref().and_then(|listing| listing.published_at))
            .or((params.status == ListingStatus::Publish).then_some(now));
        let record = ListingRecord {
            id,
            slug: params.slug,
            title: params.title,
            excerpt: params.excerpt,
            body: params.body,
            status: params.status,
            location: params.location.filter(Location::has_coordinates),
            contact: params.contact,
            opening_hours: params.opening_hours.unwrap_or_else(|| serde_json::json!({})),
            avg_rating: params.avg_rating,
            review_count: params.review_count,
            price_level: params.price_level,
            featured_image: params.featured_image,
            published_at,
            created_at: previous.map(|listing| listing.created_at).unwrap_or(now),
            modified_at: now,
        };
        state.listings.insert(id, record.clone());
        Ok(record)
    }

    async fn trash_listing(&self, id: i64) -> Result<ListingRecord, RepoError> {
        let mut state = self.state();
        let now = state.tick();
        let current = state
            .listings
            .get(&id)
            .map(|listing| listing.status)
            .ok_or(RepoError::NotFound)?;
        if current != ListingStatus::Trash {
            state.before_trash.insert(id, current);
        }
        let listing = state.listings.get_mut(&id).ok_or(RepoError::NotFound)?;
        listing.status = ListingStatus::Trash;
        listing.modified_at = now;
        Ok(listing.clone())
    }

    async fn untrash_listing(&self, id: i64) -> Result<ListingRecord, RepoError> {
        let mut state = self.state();
        let now = state.tick();
        let restored = state.before_trash.remove(&id).unwrap_or(ListingStatus::Draft);
        let listing = state.listings.get_mut(&id).ok_or(RepoError::NotFound)?;
        if listing.status == ListingStatus::Trash {
            listing.status = restored;
        }
        listing.modified_at = now;
        Ok(listing.clone())
    }

    async fn delete_listing(&self, id: i64) -> Result<ListingRecord, RepoError> {
        let mut state = self.state();
        let record = state.listings.remove(&id).ok_or(RepoError::NotFound)?;
        state.memberships.retain(|(listing, _)| *listing != id);
        state.featured.retain(|featured| *featured != id);
        state.before_trash.remove(&id);
        Ok(record)
    }

    async fn replace_listing_terms(
        &self,
        listing_id: i64,
        taxonomy: Taxonomy,
        term_ids: &[i64],
    ) -> Result<(), RepoError> {
        let mut state = self.state();
        let now = state.tick();
        let listing = state
            .listings
            .get_mut(&listing_id)
            .ok_or(RepoError::NotFound)?;
        listing.modified_at = now;

        let stale: Vec<i64> = state
            .terms_of(listing_id, taxonomy)
            .into_iter()
            .map(|term| term.id)
            .collect();
        for term_id in stale {
            state.memberships.remove(&(listing_id, term_id));
        }
        for term_id in term_ids {
            let matches = state
                .terms
                .get(term_id)
                .is_some_and(|term| term.taxonomy == taxonomy);
            if matches {
                state.memberships.insert((listing_id, *term_id));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FeaturedRepo for MemoryDirectory {
    async fn featured_ids(&self) -> Result<Vec<i64>, RepoError> {
        let state = self.state();
        Ok(state
            .featured
            .iter()
            .copied()
            .filter(|id| {
                state
                    .listings
                    .get(id)
                    .is_some_and(|listing| listing.status == ListingStatus::Publish)
            })
            .collect())
    }

    async fn replace_featured(&self, listing_ids: &[i64]) -> Result<(), RepoError> {
        self.state().featured = listing_ids.to_vec();
        Ok(())
    }
}

#[async_trait]
impl EditorialRepo for MemoryDirectory {
    async fn find_intro(&self, target: &IntroTarget) -> Result<Option<String>, RepoError> {
        Ok(self.state().intros.get(target).cloned())
    }

    async fn save_intro(&self, target: &IntroTarget, body: &str) -> Result<(), RepoError> {
        self.state()
            .intros
            .insert(target.clone(), body.to_string());
        Ok(())
    }

    async fn delete_intro(&self, target: &IntroTarget) -> Result<bool, RepoError> {
        Ok(self.state().intros.remove(target).is_some())
    }
}

/// Loader over `directory` with both cache tiers; the persistent tier is returned
/// for inspection.
pub fn loader(directory: &Arc<MemoryDirectory>) -> (ExploreLoader, Arc<MemoryTransientStore>) {
    loader_with(directory, LoaderOptions::default())
}

pub fn loader_with(
    directory: &Arc<MemoryDirectory>,
    mut options: LoaderOptions,
) -> (ExploreLoader, Arc<MemoryTransientStore>) {
    options.site_url = SITE.to_string();
    let transients = Arc::new(MemoryTransientStore::new());
    let repos = ExploreRepositories::uniform(directory.clone())
        .with_transients(transients.clone() as Arc<dyn TransientStore>);
    (ExploreLoader::new(options, repos), transients)
}
