//! Explore page queries: cached aggregates and sorted listing pages.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::application::pagination::PageWindow;
use crate::application::repos::{
    ExploreRepo, FeaturedRepo, ListingQuery, RepoError, TermCount, TermsRepo,
};
use crate::application::router::explore_url;
use crate::cache::{ExploreKey, TieredCache};
use crate::domain::MIN_BUSINESSES;
use crate::domain::entities::{ListingRecord, Location, TermRecord};
use crate::domain::types::{SortKey, Taxonomy};

/// Tags shown per area on the hub page.
pub const HUB_TOP_TAGS: usize = 8;
/// Related tags shown on an intersection page.
pub const RELATED_TAG_LIMIT: usize = 6;

#[derive(Debug, Error)]
pub enum ExploreError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    pub term_id: i64,
    pub name: String,
    pub slug: String,
    pub count: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaSummary {
    pub term_id: i64,
    pub name: String,
    pub slug: String,
    pub count: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubArea {
    pub term_id: i64,
    pub name: String,
    pub slug: String,
    pub count: u64,
    pub url: String,
    pub top_tags: Vec<TagSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRef {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A listing as rendered on city and intersection pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessCard {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub permalink: String,
    pub featured_image: String,
    pub rating: f64,
    pub review_count: i32,
    pub price_level: String,
    pub categories: Vec<String>,
    pub areas: Vec<String>,
    pub tags: Vec<TagRef>,
    pub location: Option<Location>,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    pub businesses: Vec<BusinessCard>,
    pub total: u64,
    pub pages: u32,
    pub page: u32,
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub sort: SortKey,
}

impl ListingPage {
    /// The shape served for an unknown area or tag.
    pub fn empty(area: &str, tag: Option<&str>, sort: SortKey) -> Self {
        Self {
            businesses: Vec::new(),
            total: 0,
            pages: 0,
            page: 1,
            area: area.to_string(),
            tag: tag.map(str::to_string),
            sort,
        }
    }
}

/// Cached form of one hub row; URLs are attached when served.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HubEntry {
    area: TermCount,
    top_tags: Vec<TermCount>,
}

/// Request-scoped memo of term lookups by slug.
pub struct TermLookup {
    terms: Arc<dyn TermsRepo>,
    memo: HashMap<(Taxonomy, String), Option<TermRecord>>,
}

impl TermLookup {
    pub fn new(terms: Arc<dyn TermsRepo>) -> Self {
        Self {
            terms,
            memo: HashMap::new(),
        }
    }

    pub async fn find(
        &mut self,
        taxonomy: Taxonomy,
        slug: &str,
    ) -> Result<Option<TermRecord>, RepoError> {
        let key = (taxonomy, slug.to_string());
        if let Some(hit) = self.memo.get(&key) {
            return Ok(hit.clone());
        }
        let found = self.terms.find_term(taxonomy, slug).await?;
        self.memo.insert(key, found.clone());
        Ok(found)
    }

    pub async fn area(&mut self, slug: &str) -> Result<Option<TermRecord>, RepoError> {
        self.find(Taxonomy::Area, slug).await
    }

    pub async fn tag(&mut self, slug: &str) -> Result<Option<TermRecord>, RepoError> {
        self.find(Taxonomy::Tag, slug).await
    }

    pub async fn area_exists(&mut self, slug: &str) -> Result<bool, RepoError> {
        Ok(self.area(slug).await?.is_some())
    }

    pub async fn tag_exists(&mut self, slug: &str) -> Result<bool, RepoError> {
        Ok(self.tag(slug).await?.is_some())
    }

    /// Number of distinct lookups remembered so far.
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

#[derive(Clone)]
pub struct ExploreQuery {
    repo: Arc<dyn ExploreRepo>,
    terms: Arc<dyn TermsRepo>,
    featured: Arc<dyn FeaturedRepo>,
    cache: Arc<TieredCache>,
    site_url: String,
    per_page: u32,
}

impl ExploreQuery {
    pub fn new(
        repo: Arc<dyn ExploreRepo>,
        terms: Arc<dyn TermsRepo>,
        featured: Arc<dyn FeaturedRepo>,
        cache: Arc<TieredCache>,
        site_url: impl Into<String>,
        per_page: u32,
    ) -> Self {
        Self {
            repo,
            terms,
            featured,
            cache,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            per_page: per_page.max(1),
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn validate_sort(raw: &str) -> SortKey {
        SortKey::validate(raw)
    }

    /// Fresh memo for one request.
    pub fn lookup(&self) -> TermLookup {
        TermLookup::new(self.terms.clone())
    }

    /// Tags under `area` with at least [`MIN_BUSINESSES`] listings, busiest first.
    ///
    /// `limit == 0` serves every tag; the cached list is never truncated.
    pub async fn get_tags_for_area(
        &self,
        area: &str,
        limit: usize,
    ) -> Result<Vec<TagSummary>, ExploreError> {
        let counts = self.area_tag_counts(area).await?;
        let take = if limit == 0 { counts.len() } else { limit };
        Ok(counts
            .into_iter()
            .take(take)
            .map(|tag| self.tag_summary(area, tag))
            .collect())
    }

    /// Tags of `area` other than `exclude_tag`.
    pub async fn get_related_tags(
        &self,
        area: &str,
        exclude_tag: &str,
        limit: usize,
    ) -> Result<Vec<TagSummary>, ExploreError> {
        let counts = self.area_tag_counts(area).await?;
        let take = if limit == 0 { counts.len() } else { limit };
        Ok(counts
            .into_iter()
            .filter(|tag| tag.slug != exclude_tag)
            .take(take)
            .map(|tag| self.tag_summary(area, tag))
            .collect())
    }

    /// Other areas where `tag` has enough listings, by area name.
    pub async fn get_tag_in_other_cities(
        &self,
        tag: &str,
        exclude_area: &str,
    ) -> Result<Vec<AreaSummary>, ExploreError> {
        let key = ExploreKey::TagCities(tag.to_string());
        let counts: Vec<TermCount> = self
            .cache
            .get_or_compute(&key, || self.repo.areas_for_tag(tag, MIN_BUSINESSES))
            .await?;

        Ok(counts
            .into_iter()
            .filter(|area| area.slug != exclude_area)
            .map(|area| AreaSummary {
                url: explore_url(&self.site_url, Some(&area.slug), Some(tag), 1),
                term_id: area.term_id,
                name: area.name,
                slug: area.slug,
                count: area.count,
            })
            .collect())
    }

    pub async fn get_intersection_count(&self, area: &str, tag: &str) -> Result<u64, ExploreError> {
        let key = ExploreKey::intersection(area, tag);
        let count = self
            .cache
            .get_or_compute(&key, || self.repo.count_intersection(area, tag))
            .await?;
        Ok(count)
    }

    pub async fn get_city_review_count(&self, area: &str) -> Result<u64, ExploreError> {
        let key = ExploreKey::CityReviews(area.to_string());
        let total = self
            .cache
            .get_or_compute(&key, || self.repo.sum_area_reviews(area))
            .await?;
        Ok(total)
    }

    /// Every populated area with its top tags.
    #[instrument(skip(self))]
    pub async fn get_hub_data(&self) -> Result<Vec<HubArea>, ExploreError> {
        let entries: Vec<HubEntry> = self
            .cache
            .get_or_compute(&ExploreKey::HubData, || async {
                let areas = self.repo.list_populated_areas().await?;
                let mut entries = Vec::with_capacity(areas.len());
                for area in areas {
                    let mut top_tags = self.area_tag_counts(&area.slug).await?;
                    top_tags.truncate(HUB_TOP_TAGS);
                    entries.push(HubEntry { area, top_tags });
                }
                Ok::<_, ExploreError>(entries)
            })
            .await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let area = entry.area;
                HubArea {
                    url: explore_url(&self.site_url, Some(&area.slug), None, 1),
                    top_tags: entry
                        .top_tags
                        .into_iter()
                        .map(|tag| self.tag_summary(&area.slug, tag))
                        .collect(),
                    term_id: area.term_id,
                    name: area.name,
                    slug: area.slug,
                    count: area.count,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get_city(
        &self,
        area: &str,
        page: u32,
        sort: SortKey,
    ) -> Result<ListingPage, ExploreError> {
        let mut lookup = self.lookup();
        self.city_page(&mut lookup, area, page, sort).await
    }

    #[instrument(skip(self))]
    pub async fn get_intersection(
        &self,
        area: &str,
        tag: &str,
        page: u32,
        sort: SortKey,
    ) -> Result<ListingPage, ExploreError> {
        let mut lookup = self.lookup();
        self.intersection_page(&mut lookup, area, tag, page, sort)
            .await
    }

    pub async fn city_page(
        &self,
        lookup: &mut TermLookup,
        area: &str,
        page: u32,
        sort: SortKey,
    ) -> Result<ListingPage, ExploreError> {
        if !lookup.area_exists(area).await? {
            return Ok(ListingPage::empty(area, None, sort));
        }
        self.listing_page(area, None, page, sort).await
    }

    pub async fn intersection_page(
        &self,
        lookup: &mut TermLookup,
        area: &str,
        tag: &str,
        page: u32,
        sort: SortKey,
    ) -> Result<ListingPage, ExploreError> {
        if !lookup.area_exists(area).await? || !lookup.tag_exists(tag).await? {
            return Ok(ListingPage::empty(area, Some(tag), sort));
        }
        self.listing_page(area, Some(tag), page, sort).await
    }

    async fn listing_page(
        &self,
        area: &str,
        tag: Option<&str>,
        page: u32,
        sort: SortKey,
    ) -> Result<ListingPage, ExploreError> {
        let window = PageWindow::new(page, self.per_page);
        let featured = match sort {
            SortKey::Featured => self.featured.featured_ids().await?,
            _ => Vec::new(),
        };

        let query = ListingQuery {
            area_slug: area.to_string(),
            tag_slug: tag.map(str::to_string),
            sort,
            featured,
            limit: window.per_page(),
            offset: window.offset(),
        };
        let slice = self.repo.list_listings(&query).await?;
        let businesses = self.format_businesses(slice.items).await?;

        Ok(ListingPage {
            businesses,
            total: slice.total,
            pages: window.total_pages(slice.total),
            page: window.page(),
            area: area.to_string(),
            tag: tag.map(str::to_string),
            sort,
        })
    }

    /// Cards for `records`, loading every term membership in one query.
    pub async fn format_businesses(
        &self,
        records: Vec<ListingRecord>,
    ) -> Result<Vec<BusinessCard>, ExploreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = records.iter().map(|record| record.id).collect();
        let mut memberships: HashMap<i64, Vec<TermRecord>> = HashMap::new();
        for row in self.terms.terms_for_listings(&ids).await? {
            memberships.entry(row.listing_id).or_default().push(row.term);
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let terms = memberships.remove(&record.id).unwrap_or_default();
                self.business_card(record, terms)
            })
            .collect())
    }

    fn business_card(&self, record: ListingRecord, terms: Vec<TermRecord>) -> BusinessCard {
        let mut categories = Vec::new();
        let mut areas = Vec::new();
        let mut tags = Vec::new();
        for term in terms {
            match term.taxonomy {
                Taxonomy::Category => categories.push(term.name),
                Taxonomy::Area => areas.push(term.name),
                Taxonomy::Tag => tags.push(TagRef {
                    id: term.id,
                    name: term.name,
                    slug: term.slug,
                }),
            }
        }

        BusinessCard {
            permalink: listing_permalink(&self.site_url, &record.slug),
            id: record.id,
            title: record.title,
            slug: record.slug,
            excerpt: record.excerpt,
            featured_image: record.featured_image.unwrap_or_default(),
            rating: record.avg_rating.unwrap_or(0.0),
            review_count: record.review_count.unwrap_or(0),
            price_level: record.price_level.unwrap_or_default(),
            categories,
            areas,
            tags,
            location: record.location,
            phone: record.contact.phone.unwrap_or_default(),
        }
    }

    async fn area_tag_counts(&self, area: &str) -> Result<Vec<TermCount>, ExploreError> {
        let key = ExploreKey::AreaTags(area.to_string());
        let counts = self
            .cache
            .get_or_compute(&key, || self.repo.tags_for_area(area, MIN_BUSINESSES))
            .await?;
        Ok(counts)
    }

    fn tag_summary(&self, area: &str, tag: TermCount) -> TagSummary {
        TagSummary {
            url: explore_url(&self.site_url, Some(area), Some(&tag.slug), 1),
            term_id: tag.term_id,
            name: tag.name,
            slug: tag.slug,
            count: tag.count,
        }
    }
}

/// Public page of one listing.
pub fn listing_permalink(site_url: &str, slug: &str) -> String {
    format!("{}/places/{slug}/", site_url.trim_end_matches('/'))
}
