//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod slug;
pub mod types;

/// Minimum number of published listings an (area, tag) pair needs before it
/// exists as a page, a sitemap entry or a related-tag link.
pub const MIN_BUSINESSES: u64 = 2;
