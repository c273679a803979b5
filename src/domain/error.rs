use thiserror::Error;

use super::slug::SlugError;

/// Input rejected before it reaches a repository.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{field} must not be empty")]
    Blank { field: &'static str },
    #[error("unknown taxonomy `{0}`")]
    UnknownTaxonomy(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
}

impl DomainError {
    pub fn blank(field: &'static str) -> Self {
        Self::Blank { field }
    }
}
