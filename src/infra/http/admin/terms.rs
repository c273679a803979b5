use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::application::error::HttpError;
use crate::domain::types::Taxonomy;

use super::AdminState;

#[derive(Debug, Deserialize)]
pub(super) struct CreateTermBody {
    taxonomy: Taxonomy,
    name: String,
    #[serde(default)]
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RenameTermBody {
    name: String,
}

pub(super) async fn create_term(
    State(state): State<AdminState>,
    Json(body): Json<CreateTermBody>,
) -> Result<impl IntoResponse, HttpError> {
    let term = state
        .explore
        .directory()
        .create_term(body.taxonomy, &body.name, body.slug.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(term)))
}

pub(super) async fn rename_term(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(body): Json<RenameTermBody>,
) -> Result<impl IntoResponse, HttpError> {
    let term = state.explore.directory().rename_term(id, &body.name).await?;
    Ok(Json(term))
}

pub(super) async fn delete_term(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpError> {
    let term = state.explore.directory().delete_term(id).await?;
    Ok(Json(term))
}
