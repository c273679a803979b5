//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{
    Contact, IntroTarget, ListingRecord, ListingTermRecord, Location, TermRecord,
};
use crate::domain::types::{ListingStatus, SortKey, Taxonomy};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// A term together with the number of published listings it groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term_id: i64,
    pub slug: String,
    pub name: String,
    pub count: u64,
}

/// One (area, tag) group that met the minimum size, with its latest change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntersectionRow {
    pub area_slug: String,
    pub tag_slug: String,
    pub count: u64,
    pub lastmod: Option<OffsetDateTime>,
}

/// A published listing with coordinates, as scanned for the geo sitemap.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRow {
    pub listing_id: i64,
    pub slug: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub modified_at: OffsetDateTime,
}

/// Listing page request.
///
/// The featured ordering travels with the query that needs it; nothing is
/// registered globally, so the next query cannot observe it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub area_slug: String,
    pub tag_slug: Option<String>,
    pub sort: SortKey,
    pub featured: Vec<i64>,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingSlice {
    pub items: Vec<ListingRecord>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpsertListingParams {
    #[serde(default)]
    pub id: Option<i64>,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub body: String,
    pub status: ListingStatus,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub opening_hours: Option<serde_json::Value>,
    #[serde(default)]
    pub avg_rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i32>,
    #[serde(default)]
    pub price_level: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTermParams {
    pub taxonomy: Taxonomy,
    pub slug: String,
    pub name: String,
}

/// Read side of the explore pages: aggregates and listing pages.
#[async_trait]
pub trait ExploreRepo: Send + Sync {
    /// Tags under an area with at least `min_count` published listings, count desc.
    async fn tags_for_area(&self, area_slug: &str, min_count: u64)
    -> Result<Vec<TermCount>, RepoError>;

    /// Areas carrying a tag with at least `min_count` published listings, name asc.
    async fn areas_for_tag(&self, tag_slug: &str, min_count: u64)
    -> Result<Vec<TermCount>, RepoError>;

    async fn count_intersection(&self, area_slug: &str, tag_slug: &str) -> Result<u64, RepoError>;

    async fn sum_area_reviews(&self, area_slug: &str) -> Result<u64, RepoError>;

    /// Areas with at least one published listing, name asc.
    async fn list_populated_areas(&self) -> Result<Vec<TermCount>, RepoError>;

    async fn list_listings(&self, query: &ListingQuery) -> Result<ListingSlice, RepoError>;

    async fn list_intersections(&self, min_count: u64) -> Result<Vec<IntersectionRow>, RepoError>;

    /// One window of published listings with coordinates, ordered by id.
    async fn geo_batch(&self, offset: u64, limit: u32) -> Result<Vec<GeoRow>, RepoError>;
}

#[async_trait]
pub trait TermsRepo: Send + Sync {
    async fn find_term(&self, taxonomy: Taxonomy, slug: &str)
    -> Result<Option<TermRecord>, RepoError>;

    async fn find_term_by_id(&self, id: i64) -> Result<Option<TermRecord>, RepoError>;

    async fn list_term_slugs(&self, taxonomy: Taxonomy) -> Result<Vec<String>, RepoError>;

    async fn terms_for_listing(
        &self,
        listing_id: i64,
        taxonomy: Taxonomy,
    ) -> Result<Vec<TermRecord>, RepoError>;

    /// Every term of every listing in `listing_ids`, in one round trip.
    async fn terms_for_listings(
        &self,
        listing_ids: &[i64],
    ) -> Result<Vec<ListingTermRecord>, RepoError>;
}

#[async_trait]
pub trait TermsWriteRepo: Send + Sync {
    async fn create_term(&self, params: CreateTermParams) -> Result<TermRecord, RepoError>;

    async fn rename_term(&self, id: i64, name: &str) -> Result<TermRecord, RepoError>;

    async fn delete_term(&self, id: i64) -> Result<TermRecord, RepoError>;
}

#[async_trait]
pub trait ListingsRepo: Send + Sync {
    async fn find_listing(&self, id: i64) -> Result<Option<ListingRecord>, RepoError>;

    async fn upsert_listing(&self, params: UpsertListingParams)
    -> Result<ListingRecord, RepoError>;

    async fn trash_listing(&self, id: i64) -> Result<ListingRecord, RepoError>;

    /// Restores the status the listing had before it was trashed.
    async fn untrash_listing(&self, id: i64) -> Result<ListingRecord, RepoError>;

    async fn delete_listing(&self, id: i64) -> Result<ListingRecord, RepoError>;

    async fn replace_listing_terms(
        &self,
        listing_id: i64,
        taxonomy: Taxonomy,
        term_ids: &[i64],
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait FeaturedRepo: Send + Sync {
    /// Featured listing ids in admin order, restricted to published listings.
    async fn featured_ids(&self) -> Result<Vec<i64>, RepoError>;

    async fn replace_featured(&self, listing_ids: &[i64]) -> Result<(), RepoError>;
}

#[async_trait]
pub trait EditorialRepo: Send + Sync {
    async fn find_intro(&self, target: &IntroTarget) -> Result<Option<String>, RepoError>;

    async fn save_intro(&self, target: &IntroTarget, body: &str) -> Result<(), RepoError>;

    /// Returns true if an override was removed.
    async fn delete_intro(&self, target: &IntroTarget) -> Result<bool, RepoError>;
}
