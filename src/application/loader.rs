//! Explore composition root.
//!
//! Builds the tiered cache, the event queue and its invalidator, and the
//! services that sit on top of them.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;

use crate::application::directory::DirectoryService;
use crate::application::editorial::{EditorialCopy, ExploreEditorial};
use crate::application::explore::ExploreQuery;
use crate::application::repos::{
    EditorialRepo, ExploreRepo, FeaturedRepo, ListingsRepo, TermsRepo, TermsWriteRepo,
};
use crate::application::router::ExploreRouter;
use crate::application::sitemap::{ExploreSitemap, SitemapError};
use crate::cache::{
    CacheConfig, CacheInvalidator, CacheTrigger, EventQueue, ObjectStore, TieredCache,
    TransientStore,
};
use crate::config::Settings;

const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_PER_PAGE: u32 = 20;
const DEFAULT_GEO_BATCH_SIZE: u32 = 500;

/// Knobs the loader needs from [`Settings`].
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub cache: CacheConfig,
    pub site_url: String,
    pub per_page: u32,
    pub geo_batch_size: u32,
    pub editorial: EditorialCopy,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            site_url: DEFAULT_SITE_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
            geo_batch_size: DEFAULT_GEO_BATCH_SIZE,
            editorial: EditorialCopy::default(),
        }
    }
}

impl From<&Settings> for LoaderOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            cache: CacheConfig::from(settings),
            site_url: settings.explore.site_url.clone(),
            per_page: settings.explore.per_page.get(),
            geo_batch_size: settings.explore.geositemap_batch_size.get(),
            editorial: EditorialCopy {
                community: settings.explore.community_name.clone(),
                region: settings.explore.region.clone(),
            },
        }
    }
}

/// Storage adapters behind the explore services.
#[derive(Clone)]
pub struct ExploreRepositories {
    pub explore: Arc<dyn ExploreRepo>,
    pub terms: Arc<dyn TermsRepo>,
    pub terms_write: Arc<dyn TermsWriteRepo>,
    pub listings: Arc<dyn ListingsRepo>,
    pub featured: Arc<dyn FeaturedRepo>,
    pub editorial: Arc<dyn EditorialRepo>,
    pub transients: Option<Arc<dyn TransientStore>>,
}

impl ExploreRepositories {
    /// One adapter serving every repository trait, without a persistent tier.
    pub fn uniform<R>(repo: Arc<R>) -> Self
    where
        R: ExploreRepo
            + TermsRepo
            + TermsWriteRepo
            + ListingsRepo
            + FeaturedRepo
            + EditorialRepo
            + 'static,
    {
        Self {
            explore: repo.clone(),
            terms: repo.clone(),
            terms_write: repo.clone(),
            listings: repo.clone(),
            featured: repo.clone(),
            editorial: repo,
            transients: None,
        }
    }

    pub fn with_transients(mut self, store: Arc<dyn TransientStore>) -> Self {
        self.transients = Some(store);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExploreStats {
    pub explore_urls: usize,
    pub sitemap_pages: u32,
    pub cache_tiers: Vec<&'static str>,
    pub queued_events: usize,
}

#[derive(Clone)]
pub struct ExploreLoader {
    options: LoaderOptions,
    cache: Arc<TieredCache>,
    queue: Arc<EventQueue>,
    invalidator: Arc<CacheInvalidator>,
    trigger: Arc<CacheTrigger>,
    query: ExploreQuery,
    sitemap: ExploreSitemap,
    router: ExploreRouter,
    directory: DirectoryService,
    editorial: ExploreEditorial,
}

impl ExploreLoader {
    pub fn new(options: LoaderOptions, repos: ExploreRepositories) -> Self {
        let object = Arc::new(ObjectStore::new(&options.cache));
        let cache = Arc::new(TieredCache::from_config(
            &options.cache,
            Some(object),
            repos.transients.clone(),
        ));
        let queue = Arc::new(EventQueue::new());
        let invalidator = Arc::new(CacheInvalidator::new(
            options.cache.clone(),
            cache.clone(),
            queue.clone(),
            repos.terms.clone(),
        ));
        let trigger = Arc::new(CacheTrigger::new(
            options.cache.clone(),
            queue.clone(),
            invalidator.clone(),
        ));

        let query = ExploreQuery::new(
            repos.explore.clone(),
            repos.terms.clone(),
            repos.featured.clone(),
            cache.clone(),
            options.site_url.clone(),
            options.per_page,
        );
        let sitemap = ExploreSitemap::new(
            repos.explore.clone(),
            cache.clone(),
            options.site_url.clone(),
            options.geo_batch_size,
        );
        let router = ExploreRouter::new(query.clone());
        let editorial = ExploreEditorial::new(
            repos.editorial,
            repos.terms.clone(),
            options.editorial.clone(),
        );
        let directory = DirectoryService::new(
            repos.listings,
            repos.terms,
            repos.terms_write,
            repos.featured,
            trigger.clone(),
        );

        info!(
            tiers = ?cache.tier_names(),
            ttl_secs = cache.ttl().as_secs(),
            site_url = %options.site_url,
            "Explore services initialised"
        );

        Self {
            options,
            cache,
            queue,
            invalidator,
            trigger,
            query,
            sitemap,
            router,
            directory,
            editorial,
        }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn invalidator(&self) -> &Arc<CacheInvalidator> {
        &self.invalidator
    }

    pub fn trigger(&self) -> &Arc<CacheTrigger> {
        &self.trigger
    }

    pub fn query(&self) -> &ExploreQuery {
        &self.query
    }

    pub fn sitemap(&self) -> &ExploreSitemap {
        &self.sitemap
    }

    pub fn router(&self) -> &ExploreRouter {
        &self.router
    }

    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    pub fn editorial(&self) -> &ExploreEditorial {
        &self.editorial
    }

    /// Evict every explore entry derived from any area or tag.
    pub async fn invalidate_caches(&self) -> usize {
        self.queue.clear();
        self.invalidator.invalidate_all().await
    }

    /// Number of hub, city and intersection URLs currently valid.
    pub async fn total_explore_pages(&self) -> Result<usize, SitemapError> {
        Ok(self.sitemap.get_explore_urls().await?.len())
    }

    pub async fn stats(&self) -> Result<ExploreStats, SitemapError> {
        Ok(ExploreStats {
            explore_urls: self.total_explore_pages().await?,
            sitemap_pages: self.sitemap.max_num_pages().await?,
            cache_tiers: self.cache.tier_names(),
            queued_events: self.queue.len(),
        })
    }

    /// Drain the event queue on the configured interval until aborted.
    pub fn spawn_consumer(&self) -> Option<JoinHandle<()>> {
        if !self.options.cache.is_enabled() {
            return None;
        }
        let invalidator = self.invalidator.clone();
        let period = self.options.cache.auto_consume_interval();
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                invalidator.consume_all().await;
            }
        }))
    }
}
