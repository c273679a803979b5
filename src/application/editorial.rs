//! Editorial introductions for city and intersection pages.
//!
//! Generated text is the fallback; editors may store an override per area or
//! per (area, tag) pair. A tag on its own never carries an override.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::application::directory::DirectoryError;
use crate::application::explore::ExploreError;
use crate::application::repos::{EditorialRepo, RepoError, TermsRepo};
use crate::domain::entities::{IntroTarget, TermRecord};
use crate::domain::slug::sanitize_slug;
use crate::domain::types::Taxonomy;

const DEFAULT_COMMUNITY: &str = "Love TriValley";
const DEFAULT_REGION: &str = "California";

/// Tag names that read the same in the plural.
const UNCOUNTABLE_TAGS: [&str; 5] = ["fitness", "wellness", "nightlife", "live music", "shopping"];

/// Names woven into generated intros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorialCopy {
    pub community: String,
    pub region: String,
}

impl Default for EditorialCopy {
    fn default() -> Self {
        Self {
            community: DEFAULT_COMMUNITY.to_string(),
            region: DEFAULT_REGION.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ExploreEditorial {
    repo: Arc<dyn EditorialRepo>,
    terms: Arc<dyn TermsRepo>,
    copy: EditorialCopy,
}

impl ExploreEditorial {
    pub fn new(
        repo: Arc<dyn EditorialRepo>,
        terms: Arc<dyn TermsRepo>,
        copy: EditorialCopy,
    ) -> Self {
        Self { repo, terms, copy }
    }

    /// Intro for a city page listing `count` businesses.
    pub async fn city_intro(&self, area: &TermRecord, count: u64) -> Result<String, ExploreError> {
        if let Some(text) = self.stored(&IntroTarget::city(&area.slug)).await? {
            return Ok(text);
        }
        Ok(self.generated_city_intro(&area.name, count))
    }

    /// Intro for an intersection page listing `count` businesses.
    pub async fn intersection_intro(
        &self,
        area: &TermRecord,
        tag: &TermRecord,
        count: u64,
    ) -> Result<String, ExploreError> {
        let target = IntroTarget::intersection(&area.slug, &tag.slug);
        if let Some(text) = self.stored(&target).await? {
            return Ok(text);
        }
        Ok(self.generated_intersection_intro(&tag.name, &area.name, count))
    }

    pub fn generated_city_intro(&self, area_name: &str, count: u64) -> String {
        let region = &self.copy.region;
        if count > 0 {
            format!(
                "Explore {count} local businesses in {area_name}, {region}. Find restaurants, \
                 wineries, parks, shops, and more — all recommended by our community."
            )
        } else {
            format!(
                "Discover local businesses and experiences in {area_name}, {region} — \
                 recommended by our community."
            )
        }
    }

    pub fn generated_intersection_intro(
        &self,
        tag_name: &str,
        area_name: &str,
        count: u64,
    ) -> String {
        let EditorialCopy { community, region } = &self.copy;
        let plural = pluralize_tag(tag_name);
        if count > 0 {
            format!(
                "Discover {count} {plural} in {area_name}, {region}. Browse ratings, reviews, \
                 hours & maps from the {community} community."
            )
        } else {
            format!(
                "Find the best {plural} in {area_name}, {region}. Ratings, reviews, hours & maps \
                 from the {community} community."
            )
        }
    }

    /// Store an override, or clear it when `body` is blank.
    ///
    /// Returns the normalised target and the override now in effect. The area
    /// (and tag) must exist.
    #[instrument(skip(self, body))]
    pub async fn set_intro(
        &self,
        area: &str,
        tag: Option<&str>,
        body: &str,
    ) -> Result<(IntroTarget, Option<String>), DirectoryError> {
        let area = self.existing_slug(Taxonomy::Area, area).await?;
        let target = match tag {
            Some(tag) => {
                IntroTarget::intersection(&area, &self.existing_slug(Taxonomy::Tag, tag).await?)
            }
            None => IntroTarget::city(&area),
        };

        let body = body.trim();
        if body.is_empty() {
            let removed = self.repo.delete_intro(&target).await?;
            info!(key = %target.key(), removed, "Explore intro override cleared");
            return Ok((target, None));
        }

        self.repo.save_intro(&target, body).await?;
        info!(key = %target.key(), "Explore intro override saved");
        Ok((target, Some(body.to_string())))
    }

    async fn stored(&self, target: &IntroTarget) -> Result<Option<String>, RepoError> {
        Ok(self
            .repo
            .find_intro(target)
            .await?
            .filter(|text| !text.trim().is_empty()))
    }

    async fn existing_slug(&self, taxonomy: Taxonomy, raw: &str) -> Result<String, DirectoryError> {
        let slug = sanitize_slug(raw);
        match self.terms.find_term(taxonomy, &slug).await? {
            Some(term) => Ok(term.slug),
            None => Err(DirectoryError::NotFound(format!("{taxonomy} `{raw}`"))),
        }
    }
}

/// Lowercase plural of a tag name for use mid-sentence.
pub fn pluralize_tag(name: &str) -> String {
    let lower = name.to_lowercase();

    if UNCOUNTABLE_TAGS.contains(&lower.as_str()) || lower.contains('/') || reads_plural(&lower) {
        return lower;
    }
    if ["sh", "ch", "x", "z"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{lower}es");
    }
    if let Some(stem) = lower.strip_suffix('y')
        && stem.chars().last().is_some_and(|c| !"aeiou".contains(c))
    {
        return format!("{stem}ies");
    }
    format!("{lower}s")
}

/// `-ies`, or a single trailing `s`.
fn reads_plural(lower: &str) -> bool {
    if lower.ends_with("ies") {
        return true;
    }
    let mut tail = lower.chars().rev();
    matches!((tail.next(), tail.next()), (Some('s'), Some(prev)) if prev != 's')
}
