use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::application::error::HttpError;

use super::AdminState;

#[derive(Debug, Serialize)]
struct FlushResponse {
    evicted: usize,
}

pub(super) async fn flush_cache(State(state): State<AdminState>) -> impl IntoResponse {
    let evicted = state.explore.invalidate_caches().await;
    Json(FlushResponse { evicted })
}

pub(super) async fn explore_stats(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, HttpError> {
    let stats = state.explore.stats().await?;
    Ok(Json(stats))
}
