use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::application::directory::DirectoryError;
use crate::application::error::HttpError;
use crate::application::repos::UpsertListingParams;
use crate::domain::types::Taxonomy;

use super::AdminState;

#[derive(Debug, Deserialize)]
pub(super) struct TermsBody {
    #[serde(default)]
    slugs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FeaturedBody {
    listing_ids: Vec<i64>,
}

pub(super) async fn upsert_listing(
    State(state): State<AdminState>,
    Json(params): Json<UpsertListingParams>,
) -> Result<impl IntoResponse, HttpError> {
    let record = state.explore.directory().upsert_listing(params).await?;
    Ok(Json(record))
}

pub(super) async fn trash_listing(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let record = state.explore.directory().trash_listing(id).await?;
    Ok(Json(record))
}

pub(super) async fn untrash_listing(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let record = state.explore.directory().untrash_listing(id).await?;
    Ok(Json(record))
}

pub(super) async fn delete_listing(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let record = state.explore.directory().delete_listing(id).await?;
    Ok(Json(record))
}

pub(super) async fn set_listing_terms(
    State(state): State<AdminState>,
    Path((id, taxonomy)): Path<(i64, String)>,
    Json(body): Json<TermsBody>,
) -> Result<impl IntoResponse, HttpError> {
    let taxonomy = taxonomy
        .parse::<Taxonomy>()
        .map_err(DirectoryError::from)?;
    let terms = state
        .explore
        .directory()
        .set_listing_terms(id, taxonomy, &body.slugs)
        .await?;
    Ok(Json(terms))
}

pub(super) async fn set_featured(
    State(state): State<AdminState>,
    Json(body): Json<FeaturedBody>,
) -> Result<impl IntoResponse, HttpError> {
    let featured = state
        .explore
        .directory()
        .set_featured(&body.listing_ids)
        .await?;
    Ok(Json(featured))
}
