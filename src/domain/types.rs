//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "listing_status", rename_all = "snake_case")]
pub enum ListingStatus {
    Draft,
    Publish,
    Trash,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Draft => "draft",
            ListingStatus::Publish => "publish",
            ListingStatus::Trash => "trash",
        }
    }
}

/// Taxonomies a listing can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "taxonomy", rename_all = "snake_case")]
pub enum Taxonomy {
    /// A city.
    Area,
    /// A topical label such as `wine-tasting`.
    Tag,
    Category,
}

impl Taxonomy {
    pub fn as_str(self) -> &'static str {
        match self {
            Taxonomy::Area => "area",
            Taxonomy::Tag => "tag",
            Taxonomy::Category => "category",
        }
    }

    /// Whether term-level edits in this taxonomy restructure explore pages.
    pub fn is_explore_structure(self) -> bool {
        matches!(self, Taxonomy::Area | Taxonomy::Tag)
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Taxonomy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "area" => Ok(Taxonomy::Area),
            "tag" => Ok(Taxonomy::Tag),
            "category" => Ok(Taxonomy::Category),
            other => Err(DomainError::UnknownTaxonomy(other.to_string())),
        }
    }
}

/// Orderings offered on city and intersection listing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Rating,
    Featured,
    Reviews,
    Newest,
    Name,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Rating,
        SortKey::Featured,
        SortKey::Reviews,
        SortKey::Newest,
        SortKey::Name,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Rating => "rating",
            SortKey::Featured => "featured",
            SortKey::Reviews => "reviews",
            SortKey::Newest => "newest",
            SortKey::Name => "name",
        }
    }

    /// Coerce untrusted input into a known sort, falling back to [`SortKey::Rating`].
    pub fn validate(raw: &str) -> SortKey {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == normalized)
            .unwrap_or_default()
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a term at the taxonomy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermChange {
    Created,
    Edited,
    Deleted,
}
