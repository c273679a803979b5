mod cache;
mod health;
mod intros;
mod listings;
mod state;
mod terms;

pub use state::AdminState;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};

use super::middleware::{log_responses, set_request_context};

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/api/listings", put(listings::upsert_listing))
        .route("/api/listings/{id}", delete(listings::delete_listing))
        .route("/api/listings/{id}/trash", post(listings::trash_listing))
        .route("/api/listings/{id}/untrash", post(listings::untrash_listing))
        .route(
            "/api/listings/{id}/terms/{taxonomy}",
            put(listings::set_listing_terms),
        )
        .route("/api/featured", put(listings::set_featured))
        .route("/api/terms", post(terms::create_term))
        .route(
            "/api/terms/{id}",
            patch(terms::rename_term).delete(terms::delete_term),
        )
        .route("/api/cache/flush", post(cache::flush_cache))
        .route("/api/explore/stats", get(cache::explore_stats))
        .route("/api/explore/intros/{area}", put(intros::set_city_intro))
        .route(
            "/api/explore/intros/{area}/{tag}",
            put(intros::set_intersection_intro),
        )
        .route("/_health/db", get(health::admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}
