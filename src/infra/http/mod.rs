mod admin;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::{HttpState, build_router};

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::infra::db::PostgresRepositories;

async fn db_health_response(db: Option<&Arc<PostgresRepositories>>) -> Response {
    const SOURCE: &str = "infra::http::db_health";

    let Some(db) = db else {
        let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
        ErrorReport::from_message(
            SOURCE,
            StatusCode::SERVICE_UNAVAILABLE,
            "database is not configured",
        )
        .attach(&mut response);
        return response;
    };

    match db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(SOURCE, StatusCode::SERVICE_UNAVAILABLE, &err)
                .attach(&mut response);
            response
        }
    }
}
