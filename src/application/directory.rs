//! Directory content mutations.
//!
//! Every successful write publishes the matching cache event so explore pages
//! never wait for the TTL to reflect an edit.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::application::repos::{
    CreateTermParams, FeaturedRepo, ListingsRepo, RepoError, TermsRepo, TermsWriteRepo,
    UpsertListingParams,
};
use crate::cache::CacheTrigger;
use crate::domain::entities::{ListingRecord, TermRecord};
use crate::domain::error::DomainError;
use crate::domain::slug::{derive_slug, sanitize_slug};
use crate::domain::types::{TermChange, Taxonomy};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl DirectoryError {
    fn missing(entity: &str, id: i64) -> impl FnOnce(RepoError) -> DirectoryError {
        let label = format!("{entity} {id}");
        move |err| match err {
            RepoError::NotFound => DirectoryError::NotFound(label),
            other => DirectoryError::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct DirectoryService {
    listings: Arc<dyn ListingsRepo>,
    terms: Arc<dyn TermsRepo>,
    terms_write: Arc<dyn TermsWriteRepo>,
    featured: Arc<dyn FeaturedRepo>,
    trigger: Arc<CacheTrigger>,
}

impl DirectoryService {
    pub fn new(
        listings: Arc<dyn ListingsRepo>,
        terms: Arc<dyn TermsRepo>,
        terms_write: Arc<dyn TermsWriteRepo>,
        featured: Arc<dyn FeaturedRepo>,
        trigger: Arc<CacheTrigger>,
    ) -> Self {
        Self {
            listings,
            terms,
            terms_write,
            featured,
            trigger,
        }
    }

    /// Create a listing, or update it when `params.id` is set.
    ///
    /// A blank slug is derived from the title.
    #[instrument(skip(self, params), fields(listing_id = ?params.id))]
    pub async fn upsert_listing(
        &self,
        mut params: UpsertListingParams,
    ) -> Result<ListingRecord, DirectoryError> {
        params.title = params.title.trim().to_string();
        if params.title.is_empty() {
            return Err(DomainError::blank("listing title").into());
        }

        params.slug = match sanitize_slug(&params.slug) {
            slug if slug.is_empty() => derive_slug(&params.title).map_err(DomainError::from)?,
            slug => slug,
        };

        let id = params.id;
        let record = match id {
            Some(id) => self
                .listings
                .upsert_listing(params)
                .await
                .map_err(DirectoryError::missing("listing", id))?,
            None => self.listings.upsert_listing(params).await?,
        };

        info!(listing_id = record.id, status = record.status.as_str(), "Listing saved");
        self.trigger.listing_saved(record.id).await;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn trash_listing(&self, id: i64) -> Result<ListingRecord, DirectoryError> {
        let record = self
            .listings
            .trash_listing(id)
            .await
            .map_err(DirectoryError::missing("listing", id))?;
        self.trigger.listing_trashed(id).await;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn untrash_listing(&self, id: i64) -> Result<ListingRecord, DirectoryError> {
        let record = self
            .listings
            .untrash_listing(id)
            .await
            .map_err(DirectoryError::missing("listing", id))?;
        self.trigger.listing_untrashed(id).await;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn delete_listing(&self, id: i64) -> Result<ListingRecord, DirectoryError> {
        let record = self
            .listings
            .delete_listing(id)
            .await
            .map_err(DirectoryError::missing("listing", id))?;
        self.trigger.listing_deleted(id).await;
        Ok(record)
    }

    /// Replace a listing's terms in one taxonomy. Unknown slugs become new terms.
    #[instrument(skip(self, slugs))]
    pub async fn set_listing_terms(
        &self,
        listing_id: i64,
        taxonomy: Taxonomy,
        slugs: &[String],
    ) -> Result<Vec<TermRecord>, DirectoryError> {
        if self.listings.find_listing(listing_id).await?.is_none() {
            return Err(DirectoryError::NotFound(format!("listing {listing_id}")));
        }

        let previous_slugs: Vec<String> = self
            .terms
            .terms_for_listing(listing_id, taxonomy)
            .await?
            .into_iter()
            .map(|term| term.slug)
            .collect();

        let mut assigned = Vec::new();
        for (slug, name) in normalize_term_inputs(slugs) {
            let term = match self.terms.find_term(taxonomy, &slug).await? {
                Some(term) => term,
                None => {
                    let term = self
                        .terms_write
                        .create_term(CreateTermParams {
                            taxonomy,
                            slug: slug.clone(),
                            name,
                        })
                        .await?;
                    self.trigger
                        .term_changed(taxonomy, &term.slug, TermChange::Created)
                        .await;
                    term
                }
            };
            assigned.push(term);
        }

        let ids: Vec<i64> = assigned.iter().map(|term| term.id).collect();
        self.listings
            .replace_listing_terms(listing_id, taxonomy, &ids)
            .await
            .map_err(DirectoryError::missing("listing", listing_id))?;

        info!(
            listing_id,
            taxonomy = taxonomy.as_str(),
            previous = previous_slugs.len(),
            assigned = assigned.len(),
            "Listing terms replaced"
        );
        self.trigger
            .listing_terms_set(listing_id, taxonomy, previous_slugs)
            .await;
        Ok(assigned)
    }

    #[instrument(skip(self))]
    pub async fn create_term(
        &self,
        taxonomy: Taxonomy,
        name: &str,
        slug: Option<&str>,
    ) -> Result<TermRecord, DirectoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::blank("term name").into());
        }
        let slug = match slug.map(sanitize_slug).filter(|slug| !slug.is_empty()) {
            Some(slug) => slug,
            None => derive_slug(name).map_err(DomainError::from)?,
        };

        let term = self
            .terms_write
            .create_term(CreateTermParams {
                taxonomy,
                slug,
                name: name.to_string(),
            })
            .await?;
        self.trigger
            .term_changed(taxonomy, &term.slug, TermChange::Created)
            .await;
        Ok(term)
    }

    #[instrument(skip(self))]
    pub async fn rename_term(&self, id: i64, name: &str) -> Result<TermRecord, DirectoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::blank("term name").into());
        }
        let term = self
            .terms_write
            .rename_term(id, name)
            .await
            .map_err(DirectoryError::missing("term", id))?;
        self.trigger
            .term_changed(term.taxonomy, &term.slug, TermChange::Edited)
            .await;
        Ok(term)
    }

    #[instrument(skip(self))]
    pub async fn delete_term(&self, id: i64) -> Result<TermRecord, DirectoryError> {
        let term = self
            .terms_write
            .delete_term(id)
            .await
            .map_err(DirectoryError::missing("term", id))?;
        self.trigger
            .term_changed(term.taxonomy, &term.slug, TermChange::Deleted)
            .await;
        Ok(term)
    }

    /// Replace the featured list. No cached entry depends on it.
    #[instrument(skip(self, listing_ids))]
    pub async fn set_featured(&self, listing_ids: &[i64]) -> Result<Vec<i64>, DirectoryError> {
        let mut seen = HashSet::new();
        let ordered: Vec<i64> = listing_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        self.featured.replace_featured(&ordered).await?;
        info!(count = ordered.len(), "Featured listings replaced");
        Ok(self.featured.featured_ids().await?)
    }
}

/// Normalised `(slug, name)` pairs, first occurrence wins, blanks dropped.
fn normalize_term_inputs(inputs: &[String]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    inputs
        .iter()
        .filter_map(|input| {
            let slug = sanitize_slug(input);
            if slug.is_empty() || !seen.insert(slug.clone()) {
                return None;
            }
            Some((slug, input.trim().to_string()))
        })
        .collect()
}
