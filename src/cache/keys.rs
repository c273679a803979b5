//! Explore cache keys.
//!
//! Keys are always derived from slugs, never numeric ids, so they survive a
//! re-import. The exact string forms are shared with anything else that reads
//! or evicts the same entries.

use md5::{Digest, Md5};

/// Length of the hex digest suffix used by persistent-tier keys.
const TRANSIENT_SUFFIX_LEN: usize = 12;

/// One cached explore computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExploreKey {
    /// Every populated area with its top tags.
    HubData,
    /// Tags with enough listings under one area.
    AreaTags(String),
    /// Areas with enough listings for one tag.
    TagCities(String),
    /// Sum of review counts in one area.
    CityReviews(String),
    /// Listing count of one (area, tag) pair.
    IntersectionCount { area: String, tag: String },
    /// Hub, city and intersection URLs for the sitemap.
    SitemapUrls,
    /// Rendered geo sitemap document.
    GeoSitemap,
}

impl ExploreKey {
    pub fn intersection(area: &str, tag: &str) -> Self {
        Self::IntersectionCount {
            area: area.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Key in the in-process object tier, if this entry lives there.
    pub fn object_key(&self) -> Option<String> {
        match self {
            ExploreKey::HubData => Some("hub_data".to_string()),
            ExploreKey::AreaTags(area) => Some(format!("area_tags_{area}")),
            ExploreKey::TagCities(tag) => Some(format!("tag_cities_{tag}")),
            ExploreKey::CityReviews(area) => Some(format!("city_reviews_{area}")),
            ExploreKey::IntersectionCount { area, tag } => {
                Some(format!("intersection_count_{area}_{tag}"))
            }
            ExploreKey::SitemapUrls => Some("bd_explore_sitemap_urls".to_string()),
            ExploreKey::GeoSitemap => None,
        }
    }

    /// Key in the persistent tier, if this entry is mirrored there.
    pub fn transient_key(&self) -> Option<String> {
        match self {
            ExploreKey::AreaTags(area) => Some(format!("bd_ex_atags_{}", transient_suffix(area))),
            ExploreKey::TagCities(tag) => Some(format!("bd_ex_tcit_{}", transient_suffix(tag))),
            ExploreKey::SitemapUrls => Some("bd_ex_sitemap_urls".to_string()),
            ExploreKey::GeoSitemap => Some("bd_geositemap_xml".to_string()),
            ExploreKey::HubData
            | ExploreKey::CityReviews(_)
            | ExploreKey::IntersectionCount { .. } => None,
        }
    }

    /// Low-cardinality label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ExploreKey::HubData => "hub_data",
            ExploreKey::AreaTags(_) => "area_tags",
            ExploreKey::TagCities(_) => "tag_cities",
            ExploreKey::CityReviews(_) => "city_reviews",
            ExploreKey::IntersectionCount { .. } => "intersection_count",
            ExploreKey::SitemapUrls => "sitemap_urls",
            ExploreKey::GeoSitemap => "geo_sitemap",
        }
    }

    /// Entries that any listing change can make stale.
    pub fn global() -> [ExploreKey; 3] {
        [
            ExploreKey::HubData,
            ExploreKey::SitemapUrls,
            ExploreKey::GeoSitemap,
        ]
    }

    pub fn for_area(area: &str) -> [ExploreKey; 2] {
        [
            ExploreKey::AreaTags(area.to_string()),
            ExploreKey::CityReviews(area.to_string()),
        ]
    }

    pub fn for_tag(tag: &str) -> ExploreKey {
        ExploreKey::TagCities(tag.to_string())
    }
}

/// First twelve hex characters of the MD5 digest of `slug`.
pub fn transient_suffix(slug: &str) -> String {
    let digest = Md5::digest(slug.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(TRANSIENT_SUFFIX_LEN);
    encoded
}
