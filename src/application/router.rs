//! Explore URL scheme and the page-or-404 decision.
//!
//! ```text
//! /explore/                          hub
//! /explore/{area}/[page/{n}/]        city
//! /explore/{area}/{tag}/[page/{n}/]  intersection
//! ```

use serde::Serialize;

use crate::application::explore::{ExploreError, ExploreQuery, TermLookup};
use crate::domain::MIN_BUSINESSES;
use crate::domain::entities::TermRecord;
use crate::domain::slug::sanitize_slug;

const EXPLORE_SEGMENT: &str = "explore";
const PAGE_SEGMENT: &str = "page";

pub const HUB_TITLE: &str = "Discover the Tri-Valley: Local Businesses & Experiences";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExploreRoute {
    Hub,
    City { area: String, page: u32 },
    Intersection { area: String, tag: String, page: u32 },
}

impl ExploreRoute {
    /// Parse a request path. Slugs are normalised; malformed paths yield `None`.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let (first, rest) = segments.split_first()?;
        if *first != EXPLORE_SEGMENT {
            return None;
        }

        match rest {
            [] => Some(Self::Hub),
            [area] => Some(Self::City {
                area: route_slug(area)?,
                page: 1,
            }),
            [area, PAGE_SEGMENT, page] => Some(Self::City {
                area: route_slug(area)?,
                page: parse_page(page)?,
            }),
            [area, tag] => Some(Self::Intersection {
                area: route_slug(area)?,
                tag: route_slug(tag)?,
                page: 1,
            }),
            [area, tag, PAGE_SEGMENT, page] => Some(Self::Intersection {
                area: route_slug(area)?,
                tag: route_slug(tag)?,
                page: parse_page(page)?,
            }),
            _ => None,
        }
    }

    pub fn area(&self) -> Option<&str> {
        match self {
            Self::Hub => None,
            Self::City { area, .. } | Self::Intersection { area, .. } => Some(area),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Intersection { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            Self::Hub => 1,
            Self::City { page, .. } | Self::Intersection { page, .. } => *page,
        }
    }

    pub fn canonical_url(&self, base: &str) -> String {
        explore_url(base, self.area(), self.tag(), self.page())
    }
}

/// Absolute explore URL. Page 1 carries no page suffix; a tag needs an area.
pub fn explore_url(base: &str, area: Option<&str>, tag: Option<&str>, page: u32) -> String {
    let mut url = format!("{}/{EXPLORE_SEGMENT}/", base.trim_end_matches('/'));
    if let Some(area) = area {
        url.push_str(&sanitize_slug(area));
        url.push('/');
        if let Some(tag) = tag {
            url.push_str(&sanitize_slug(tag));
            url.push('/');
        }
    }
    if page > 1 {
        url.push_str(&format!("{PAGE_SEGMENT}/{page}/"));
    }
    url
}

pub fn city_title(area_name: &str) -> String {
    format!("Explore {area_name}: Local Businesses & Experiences")
}

pub fn intersection_title(tag_name: &str, area_name: &str) -> String {
    format!("{tag_name} in {area_name}, CA: Discover Local")
}

/// A route that names a page which exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRoute {
    pub route: ExploreRoute,
    pub canonical_url: String,
    pub title: String,
    pub area: Option<TermRecord>,
    pub tag: Option<TermRecord>,
}

#[derive(Clone)]
pub struct ExploreRouter {
    query: ExploreQuery,
}

impl ExploreRouter {
    pub fn new(query: ExploreQuery) -> Self {
        Self { query }
    }

    /// `Ok(None)` means the request is a 404.
    ///
    /// A city needs an existing area; an intersection also needs an existing
    /// tag and at least [`MIN_BUSINESSES`] listings.
    pub async fn resolve(
        &self,
        lookup: &mut TermLookup,
        route: ExploreRoute,
    ) -> Result<Option<ResolvedRoute>, ExploreError> {
        let base = self.query.site_url();
        match &route {
            ExploreRoute::Hub => Ok(Some(ResolvedRoute {
                canonical_url: route.canonical_url(base),
                title: HUB_TITLE.to_string(),
                area: None,
                tag: None,
                route,
            })),
            ExploreRoute::City { area, .. } => {
                let Some(area_term) = lookup.area(area).await? else {
                    return Ok(None);
                };
                Ok(Some(ResolvedRoute {
                    canonical_url: route.canonical_url(base),
                    title: city_title(&area_term.name),
                    area: Some(area_term),
                    tag: None,
                    route,
                }))
            }
            ExploreRoute::Intersection { area, tag, .. } => {
                let Some(area_term) = lookup.area(area).await? else {
                    return Ok(None);
                };
                let Some(tag_term) = lookup.tag(tag).await? else {
                    return Ok(None);
                };
                if self.query.get_intersection_count(area, tag).await? < MIN_BUSINESSES {
                    return Ok(None);
                }
                Ok(Some(ResolvedRoute {
                    canonical_url: route.canonical_url(base),
                    title: intersection_title(&tag_term.name, &area_term.name),
                    area: Some(area_term),
                    tag: Some(tag_term),
                    route,
                }))
            }
        }
    }
}

fn route_slug(segment: &str) -> Option<String> {
    let slug = sanitize_slug(segment);
    (!slug.is_empty() && slug != PAGE_SEGMENT).then_some(slug)
}

fn parse_page(segment: &str) -> Option<u32> {
    segment.parse::<u32>().ok().filter(|page| *page >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_route_shape() {
        assert_eq!(ExploreRoute::parse("/explore/"), Some(ExploreRoute::Hub));
        assert_eq!(ExploreRoute::parse("/explore"), Some(ExploreRoute::Hub));
        assert_eq!(
            ExploreRoute::parse("/explore/livermore/"),
            Some(ExploreRoute::City {
                area: "livermore".into(),
                page: 1
            })
        );
        assert_eq!(
            ExploreRoute::parse("/explore/livermore/page/3/"),
            Some(ExploreRoute::City {
                area: "livermore".into(),
                page: 3
            })
        );
        assert_eq!(
            ExploreRoute::parse("/explore/livermore/wine-tasting/"),
            Some(ExploreRoute::Intersection {
                area: "livermore".into(),
                tag: "wine-tasting".into(),
                page: 1
            })
        );
        assert_eq!(
            ExploreRoute::parse("/explore/livermore/wine-tasting/page/2"),
            Some(ExploreRoute::Intersection {
                area: "livermore".into(),
                tag: "wine-tasting".into(),
                page: 2
            })
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(ExploreRoute::parse("/places/livermore/"), None);
        assert_eq!(ExploreRoute::parse("/explore/livermore/page/"), None);
        assert_eq!(ExploreRoute::parse("/explore/livermore/page/0/"), None);
        assert_eq!(ExploreRoute::parse("/explore/livermore/page/x/"), None);
        assert_eq!(ExploreRoute::parse("/explore/a/b/c/d/e/"), None);
        assert_eq!(ExploreRoute::parse("/explore/%%%/"), None);
    }

    #[test]
    fn slugs_are_normalised() {
        assert_eq!(
            ExploreRoute::parse("/explore/Livermore/"),
            Some(ExploreRoute::City {
                area: "livermore".into(),
                page: 1
            })
        );
    }

    #[test]
    fn urls_omit_first_page() {
        let base = "https://dir.example/";
        assert_eq!(explore_url(base, None, None, 1), "https://dir.example/explore/");
        assert_eq!(
            explore_url(base, Some("livermore"), None, 1),
            "https://dir.example/explore/livermore/"
        );
        assert_eq!(
            explore_url(base, Some("livermore"), Some("wine"), 3),
            "https://dir.example/explore/livermore/wine/page/3/"
        );
        assert_eq!(
            explore_url(base, None, Some("wine"), 1),
            "https://dir.example/explore/"
        );
    }

    #[test]
    fn canonical_url_round_trips_through_parse() {
        let route = ExploreRoute::Intersection {
            area: "pleasanton".into(),
            tag: "brewery".into(),
            page: 4,
        };
        let url = route.canonical_url("https://dir.example");
        let path = url.trim_start_matches("https://dir.example");
        assert_eq!(ExploreRoute::parse(path), Some(route));
    }

    #[test]
    fn titles() {
        assert_eq!(
            city_title("Livermore"),
            "Explore Livermore: Local Businesses & Experiences"
        );
        assert_eq!(
            intersection_title("Wine Tasting", "Livermore"),
            "Wine Tasting in Livermore, CA: Discover Local"
        );
    }
}
