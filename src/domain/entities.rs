//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{ListingStatus, Taxonomy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingRecord {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub status: ListingStatus,
    pub location: Option<Location>,
    pub contact: Contact,
    pub opening_hours: serde_json::Value,
    pub avg_rating: Option<f64>,
    pub review_count: Option<i32>,
    pub price_level: Option<String>,
    pub featured_image: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
}

impl Location {
    /// Zero or non-finite coordinates are placeholders, not positions.
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && self.lat != 0.0 && self.lng != 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contact {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRecord {
    pub id: i64,
    pub taxonomy: Taxonomy,
    pub slug: String,
    pub name: String,
}

/// A term attached to one listing, as loaded in one batch for a result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTermRecord {
    pub listing_id: i64,
    pub term: TermRecord,
}

/// The explore page an editorial intro override belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntroTarget {
    pub area: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl IntroTarget {
    pub fn city(area: &str) -> Self {
        Self {
            area: area.to_string(),
            tag: None,
        }
    }

    pub fn intersection(area: &str, tag: &str) -> Self {
        Self {
            area: area.to_string(),
            tag: Some(tag.to_string()),
        }
    }

    /// Stable name of the override, `bd_explore_intro_{area}[_{tag}]`.
    pub fn key(&self) -> String {
        match &self.tag {
            Some(tag) => format!("bd_explore_intro_{}_{}", self.area, tag),
            None => format!("bd_explore_intro_{}", self.area),
        }
    }
}
