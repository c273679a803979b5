use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::application::error::HttpError;
use crate::domain::entities::IntroTarget;

use super::AdminState;

#[derive(Debug, Deserialize)]
pub(super) struct IntroBody {
    #[serde(default)]
    intro: String,
}

#[derive(Debug, Serialize)]
struct IntroResponse {
    #[serde(flatten)]
    target: IntroTarget,
    intro: Option<String>,
}

pub(super) async fn set_city_intro(
    State(state): State<AdminState>,
    Path(area): Path<String>,
    Json(body): Json<IntroBody>,
) -> Result<impl IntoResponse, HttpError> {
    let (target, intro) = state
        .explore
        .editorial()
        .set_intro(&area, None, &body.intro)
        .await?;
    Ok(Json(IntroResponse { target, intro }))
}

pub(super) async fn set_intersection_intro(
    State(state): State<AdminState>,
    Path((area, tag)): Path<(String, String)>,
    Json(body): Json<IntroBody>,
) -> Result<impl IntoResponse, HttpError> {
    let (target, intro) = state
        .explore
        .editorial()
        .set_intro(&area, Some(&tag), &body.intro)
        .await?;
    Ok(Json(IntroResponse { target, intro }))
}
