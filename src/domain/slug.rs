//! Slug helpers shared by routing and term management.
//!
//! Every explore cache key and URL is derived from slugs, so the same
//! normalisation must run on incoming paths and on stored terms.

use slug::slugify;
use thiserror::Error;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a slug from human-readable text such as a term name.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Normalise a slug taken from a URL or request body.
///
/// Returns an empty string when nothing representable remains.
pub fn sanitize_slug(input: &str) -> String {
    slugify(input.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_from_term_name() {
        assert_eq!(derive_slug("Wine Tasting").expect("slug"), "wine-tasting");
        assert_eq!(derive_slug("San Ramón").expect("slug"), "san-ramon");
    }

    #[test]
    fn derive_slug_rejects_empty_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
        assert!(matches!(
            derive_slug("!!!"),
            Err(SlugError::Unrepresentable { .. })
        ));
    }

    #[test]
    fn sanitize_slug_is_idempotent() {
        let once = sanitize_slug("  Livermore ");
        assert_eq!(once, "livermore");
        assert_eq!(sanitize_slug(&once), once);
        assert_eq!(sanitize_slug("%%%"), "");
    }
}
