use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{
        HeaderValue, StatusCode, Uri,
        header::{CONTENT_TYPE, HeaderName},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use url::form_urlencoded;

use crate::{
    application::{
        error::HttpError,
        explore::{AreaSummary, ExploreError, HubArea, ListingPage, RELATED_TAG_LIMIT, TagSummary},
        loader::ExploreLoader,
        map::{MapPin, extract_pins},
        router::{ExploreRoute, ResolvedRoute},
        sitemap::{SitemapError, render_urlset},
    },
    domain::types::SortKey,
    infra::db::PostgresRepositories,
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
};

const XML_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";
const X_ROBOTS_TAG: HeaderName = HeaderName::from_static("x-robots-tag");
const SITEMAP_PAGE_PREFIX: &str = "/sitemap-explore-";
const SITEMAP_PAGE_SUFFIX: &str = ".xml";

#[derive(Clone)]
pub struct HttpState {
    pub explore: ExploreLoader,
    pub db: Option<Arc<PostgresRepositories>>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/geo-sitemap.xml", get(geo_sitemap))
        .route("/_health/db", get(public_health))
        .fallback(fallback_router)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// First `sort` parameter of the query string; anything unusable means rating.
fn requested_sort(query: Option<&str>) -> SortKey {
    let raw = query.and_then(|query| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == "sort")
            .map(|(_, value)| value.into_owned())
    });
    SortKey::validate(raw.as_deref().unwrap_or_default())
}

#[derive(Debug, Serialize)]
struct HubResponse {
    route: ResolvedRoute,
    areas: Vec<HubArea>,
}

#[derive(Debug, Serialize)]
struct CityResponse {
    route: ResolvedRoute,
    intro: String,
    listings: ListingPage,
    pins: Vec<MapPin>,
    tags: Vec<TagSummary>,
    review_count: u64,
}

#[derive(Debug, Serialize)]
struct IntersectionResponse {
    route: ResolvedRoute,
    intro: String,
    listings: ListingPage,
    pins: Vec<MapPin>,
    count: u64,
    related_tags: Vec<TagSummary>,
    other_cities: Vec<AreaSummary>,
}

/// Explore pages and sitemap provider pages; everything else is a 404.
async fn fallback_router(State(state): State<HttpState>, uri: Uri) -> Response {
    let path = uri.path();

    if let Some(page) = sitemap_page_number(path) {
        return match explore_sitemap_page(&state, page).await {
            Ok(response) => response,
            Err(err) => HttpError::from(err).into_response(),
        };
    }

    let Some(route) = ExploreRoute::parse(path) else {
        return not_found();
    };

    match explore_page(&state, route, requested_sort(uri.query())).await {
        Ok(Some(response)) => response,
        Ok(None) => not_found(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn explore_page(
    state: &HttpState,
    route: ExploreRoute,
    sort: SortKey,
) -> Result<Option<Response>, ExploreError> {
    let query = state.explore.query();
    let editorial = state.explore.editorial();
    let mut lookup = query.lookup();
    let Some(resolved) = state.explore.router().resolve(&mut lookup, route).await? else {
        return Ok(None);
    };

    let response = match resolved.route.clone() {
        ExploreRoute::Hub => Json(HubResponse {
            areas: query.get_hub_data().await?,
            route: resolved,
        })
        .into_response(),
        ExploreRoute::City { area, page } => {
            let Some(area_term) = resolved.area.as_ref() else {
                return Ok(None);
            };
            let listings = query.city_page(&mut lookup, &area, page, sort).await?;
            Json(CityResponse {
                intro: editorial.city_intro(area_term, listings.total).await?,
                pins: extract_pins(&listings.businesses),
                tags: query.get_tags_for_area(&area, 0).await?,
                review_count: query.get_city_review_count(&area).await?,
                listings,
                route: resolved,
            })
            .into_response()
        }
        ExploreRoute::Intersection { area, tag, page } => {
            let (Some(area_term), Some(tag_term)) = (resolved.area.as_ref(), resolved.tag.as_ref())
            else {
                return Ok(None);
            };
            let listings = query
                .intersection_page(&mut lookup, &area, &tag, page, sort)
                .await?;
            Json(IntersectionResponse {
                intro: editorial
                    .intersection_intro(area_term, tag_term, listings.total)
                    .await?,
                pins: extract_pins(&listings.businesses),
                count: query.get_intersection_count(&area, &tag).await?,
                related_tags: query
                    .get_related_tags(&area, &tag, RELATED_TAG_LIMIT)
                    .await?,
                other_cities: query.get_tag_in_other_cities(&tag, &area).await?,
                listings,
                route: resolved,
            })
            .into_response()
        }
    };

    Ok(Some(response))
}

async fn explore_sitemap_page(state: &HttpState, page: u32) -> Result<Response, SitemapError> {
    let sitemap = state.explore.sitemap();
    if page > sitemap.max_num_pages().await? {
        return Ok(not_found());
    }
    let entries = sitemap.url_list(page).await?;
    Ok(xml_response(render_urlset(&entries), false))
}

async fn geo_sitemap(State(state): State<HttpState>) -> Response {
    match state.explore.sitemap().generate_geositemap().await {
        Ok(body) => xml_response(body, true),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.as_ref()).await
}

/// `N` from `/sitemap-explore-N.xml`, when N is a page number.
fn sitemap_page_number(path: &str) -> Option<u32> {
    path.strip_prefix(SITEMAP_PAGE_PREFIX)?
        .strip_suffix(SITEMAP_PAGE_SUFFIX)?
        .parse::<u32>()
        .ok()
        .filter(|page| *page >= 1)
}

fn not_found() -> Response {
    HttpError::new(
        "infra::http::public::not_found",
        StatusCode::NOT_FOUND,
        "Not found",
        "no explore page at this path",
    )
    .into_response()
}

fn xml_response(body: String, noindex: bool) -> Response {
    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));
    if noindex {
        response
            .headers_mut()
            .insert(X_ROBOTS_TAG, HeaderValue::from_static("noindex"));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sitemap_page_numbers() {
        assert_eq!(sitemap_page_number("/sitemap-explore-1.xml"), Some(1));
        assert_eq!(sitemap_page_number("/sitemap-explore-12.xml"), Some(12));
        assert_eq!(sitemap_page_number("/sitemap-explore-0.xml"), None);
        assert_eq!(sitemap_page_number("/sitemap-explore-x.xml"), None);
        assert_eq!(sitemap_page_number("/explore/"), None);
    }

    #[test]
    fn sort_query_falls_back_to_rating() {
        assert_eq!(requested_sort(Some("sort=bogus")), SortKey::Rating);
        assert_eq!(requested_sort(None), SortKey::Rating);
        assert_eq!(requested_sort(Some("page=2")), SortKey::Rating);
    }

    #[test]
    fn sort_query_is_lenient() {
        assert_eq!(requested_sort(Some("sort=name&sort=newest")), SortKey::Name);
        assert_eq!(requested_sort(Some("sort=%6Eame")), SortKey::Name);
        assert_eq!(requested_sort(Some("sort&x=%zz")), SortKey::Rating);
    }
}
