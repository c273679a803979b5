//! Geo sitemap and explore URL list.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, instrument};

use crate::application::explore::listing_permalink;
use crate::application::pagination::{page_count, slice_page};
use crate::application::repos::{ExploreRepo, GeoRow, RepoError};
use crate::application::router::explore_url;
use crate::cache::{ExploreKey, TieredCache};
use crate::domain::MIN_BUSINESSES;
use crate::domain::entities::Location;

/// Entries per page of the explore sitemap provider.
pub const URLS_PER_SITEMAP: usize = 2000;

const METRIC_GEO_BATCHES: &str = "bizdir_geositemap_batches_total";

const URLSET_OPEN: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n";
const GEO_URLSET_OPEN: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"\n        \
xmlns:geo=\"http://www.google.com/geo/schemas/sitemap/1.0\">\n";
const URLSET_CLOSE: &str = "</urlset>\n";

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to format lastmod: {0}")]
    Format(#[from] time::error::Format),
}

/// One explore URL with its last modification, empty when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: String,
}

#[derive(Clone)]
pub struct ExploreSitemap {
    repo: Arc<dyn ExploreRepo>,
    cache: Arc<TieredCache>,
    site_url: String,
    batch_size: u32,
}

impl ExploreSitemap {
    pub fn new(
        repo: Arc<dyn ExploreRepo>,
        cache: Arc<TieredCache>,
        site_url: impl Into<String>,
        batch_size: u32,
    ) -> Self {
        Self {
            repo,
            cache,
            site_url: site_url.into().trim_end_matches('/').to_string(),
            batch_size: batch_size.max(1),
        }
    }

    /// `urlset` document with a `geo:geo` block per located listing.
    #[instrument(skip(self))]
    pub async fn generate_geositemap(&self) -> Result<String, SitemapError> {
        self.cache
            .get_or_compute(&ExploreKey::GeoSitemap, || self.build_geositemap())
            .await
    }

    async fn build_geositemap(&self) -> Result<String, SitemapError> {
        let mut xml = String::from(GEO_URLSET_OPEN);
        let mut offset = 0u64;
        let mut written = 0usize;

        loop {
            let batch = self.repo.geo_batch(offset, self.batch_size).await?;
            counter!(METRIC_GEO_BATCHES).increment(1);
            let fetched = batch.len();

            for row in batch {
                if self.push_geo_url(&mut xml, &row)? {
                    written += 1;
                }
            }

            if fetched < self.batch_size as usize {
                break;
            }
            offset += u64::from(self.batch_size);
        }

        xml.push_str(URLSET_CLOSE);
        debug!(urls = written, "Geo sitemap rebuilt");
        Ok(xml)
    }

    fn push_geo_url(&self, xml: &mut String, row: &GeoRow) -> Result<bool, SitemapError> {
        let (Some(lat), Some(lng)) = (row.lat, row.lng) else {
            return Ok(false);
        };
        let position = Location {
            lat,
            lng,
            ..Location::default()
        };
        if !position.has_coordinates() {
            return Ok(false);
        }

        let loc = xml_escape(&listing_permalink(&self.site_url, &row.slug));
        let lastmod = w3c_datetime(row.modified_at)?;
        // Writing to a String cannot fail.
        let _ = write!(
            xml,
            "  <url>\n    <loc>{loc}</loc>\n    <lastmod>{lastmod}</lastmod>\n    \
             <geo:geo>\n      <geo:format>kml</geo:format>\n      \
             <geo:lat>{lat}</geo:lat>\n      <geo:long>{lng}</geo:long>\n    \
             </geo:geo>\n  </url>\n"
        );
        Ok(true)
    }

    /// Hub, then every populated area, then every intersection with enough listings.
    #[instrument(skip(self))]
    pub async fn get_explore_urls(&self) -> Result<Vec<SitemapEntry>, SitemapError> {
        self.cache
            .get_or_compute(&ExploreKey::SitemapUrls, || self.build_explore_urls())
            .await
    }

    async fn build_explore_urls(&self) -> Result<Vec<SitemapEntry>, SitemapError> {
        let intersections = self.repo.list_intersections(MIN_BUSINESSES).await?;
        let areas = self.repo.list_populated_areas().await?;

        let mut area_lastmod: BTreeMap<&str, OffsetDateTime> = BTreeMap::new();
        for row in &intersections {
            if let Some(lastmod) = row.lastmod {
                area_lastmod
                    .entry(row.area_slug.as_str())
                    .and_modify(|current| *current = (*current).max(lastmod))
                    .or_insert(lastmod);
            }
        }

        let hub_lastmod = areas
            .iter()
            .filter_map(|area| area_lastmod.get(area.slug.as_str()).copied())
            .max();

        let mut entries = Vec::with_capacity(1 + areas.len() + intersections.len());
        entries.push(SitemapEntry {
            loc: explore_url(&self.site_url, None, None, 1),
            lastmod: optional_w3c(hub_lastmod)?,
        });

        for area in &areas {
            entries.push(SitemapEntry {
                loc: explore_url(&self.site_url, Some(&area.slug), None, 1),
                lastmod: optional_w3c(area_lastmod.get(area.slug.as_str()).copied())?,
            });
        }

        for row in &intersections {
            entries.push(SitemapEntry {
                loc: explore_url(&self.site_url, Some(&row.area_slug), Some(&row.tag_slug), 1),
                lastmod: optional_w3c(row.lastmod)?,
            });
        }

        Ok(entries)
    }

    /// Entries on sitemap page `page` (1-based).
    pub async fn url_list(&self, page: u32) -> Result<Vec<SitemapEntry>, SitemapError> {
        let entries = self.get_explore_urls().await?;
        Ok(slice_page(&entries, page, URLS_PER_SITEMAP))
    }

    pub async fn max_num_pages(&self) -> Result<u32, SitemapError> {
        let entries = self.get_explore_urls().await?;
        Ok(page_count(entries.len(), URLS_PER_SITEMAP))
    }
}

/// Plain `urlset` document for one provider page.
pub fn render_urlset(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(URLSET_OPEN);
    for entry in entries {
        let loc = xml_escape(&entry.loc);
        if entry.lastmod.is_empty() {
            let _ = writeln!(xml, "  <url><loc>{loc}</loc></url>");
        } else {
            let _ = writeln!(
                xml,
                "  <url><loc>{loc}</loc><lastmod>{}</lastmod></url>",
                entry.lastmod
            );
        }
    }
    xml.push_str(URLSET_CLOSE);
    xml
}

/// `YYYY-MM-DDThh:mm:ss+00:00` in UTC.
pub fn w3c_datetime(value: OffsetDateTime) -> Result<String, time::error::Format> {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]+00:00");
    value.to_offset(UtcOffset::UTC).format(format)
}

fn optional_w3c(value: Option<OffsetDateTime>) -> Result<String, SitemapError> {
    match value {
        Some(value) => Ok(w3c_datetime(value)?),
        None => Ok(String::new()),
    }
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
