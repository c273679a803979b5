//! Explore page queries against the in-memory directory.

mod support;

use std::collections::BTreeSet;

use bizdir::application::explore::ExploreQuery;
use bizdir::application::loader::LoaderOptions;
use bizdir::domain::types::SortKey;

use support::{Calls, MemoryDirectory, SITE, loader, loader_with};

fn ids(page: &bizdir::application::explore::ListingPage) -> Vec<i64> {
    page.businesses.iter().map(|card| card.id).collect()
}

#[tokio::test]
async fn livermore_lists_wine_tasting_but_not_hiking() {
    let dir = MemoryDirectory::new();
    for slug in ["cellar-one", "cellar-two", "cellar-three"] {
        dir.listing(slug).area("livermore").tag("wine-tasting").insert();
    }
    dir.listing("ridge-trail").area("livermore").tag("hiking").insert();
    let (explore, _) = loader(&dir);

    let tags = explore
        .query()
        .get_tags_for_area("livermore", 0)
        .await
        .expect("tags");

    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].slug, "wine-tasting");
    assert_eq!(tags[0].name, "Wine Tasting");
    assert_eq!(tags[0].count, 3);
    assert_eq!(tags[0].url, format!("{SITE}/explore/livermore/wine-tasting/"));
}

#[tokio::test]
async fn area_tags_are_computed_once_then_served_from_cache() {
    let dir = MemoryDirectory::new();
    dir.listing("a").area("dublin").tag("brewery").insert();
    dir.listing("b").area("dublin").tag("brewery").insert();
    let (explore, _) = loader(&dir);

    let first = explore.query().get_tags_for_area("dublin", 0).await.expect("tags");
    let second = explore.query().get_tags_for_area("dublin", 0).await.expect("tags");

    assert_eq!(first, second);
    assert_eq!(Calls::get(&dir.calls.tags_for_area), 1);
}

#[tokio::test]
async fn related_tags_exclude_the_current_tag_and_honour_limit() {
    let dir = MemoryDirectory::new();
    for (slug, tags) in [
        ("a", vec!["brewery", "patio", "live-music"]),
        ("b", vec!["brewery", "patio", "live-music"]),
        ("c", vec!["brewery", "patio"]),
    ] {
        let mut seed = dir.listing(slug).area("pleasanton");
        for tag in tags {
            seed = seed.tag(tag);
        }
        seed.insert();
    }
    let (explore, _) = loader(&dir);

    let related = explore
        .query()
        .get_related_tags("pleasanton", "brewery", 1)
        .await
        .expect("related");
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].slug, "patio");

    let all = explore
        .query()
        .get_related_tags("pleasanton", "brewery", 0)
        .await
        .expect("related");
    let slugs: Vec<&str> = all.iter().map(|tag| tag.slug.as_str()).collect();
    assert_eq!(slugs, vec!["patio", "live-music"]);
}

#[tokio::test]
async fn tag_in_other_cities_skips_current_and_thin_areas() {
    let dir = MemoryDirectory::new();
    dir.listing("a").area("dublin").tag("brewery").insert();
    dir.listing("b").area("dublin").tag("brewery").insert();
    dir.listing("c").area("pleasanton").tag("brewery").insert();
    dir.listing("d").area("pleasanton").tag("brewery").insert();
    dir.listing("e").area("livermore").tag("brewery").insert();
    let (explore, _) = loader(&dir);

    let cities = explore
        .query()
        .get_tag_in_other_cities("brewery", "dublin")
        .await
        .expect("cities");

    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].slug, "pleasanton");
    assert_eq!(cities[0].count, 2);
    assert_eq!(cities[0].url, format!("{SITE}/explore/pleasanton/brewery/"));
}

#[tokio::test]
async fn hub_lists_populated_areas_with_top_tags() {
    let dir = MemoryDirectory::new();
    dir.listing("a").area("livermore").tag("wine-tasting").insert();
    dir.listing("b").area("livermore").tag("wine-tasting").insert();
    dir.listing("c").area("dublin").tag("hiking").insert();
    dir.listing("draft").area("san-ramon").tag("hiking").draft().insert();
    let (explore, _) = loader(&dir);

    let hub = explore.query().get_hub_data().await.expect("hub");

    let areas: Vec<&str> = hub.iter().map(|area| area.slug.as_str()).collect();
    assert_eq!(areas, vec!["dublin", "livermore"]);
    assert!(hub[0].top_tags.is_empty());
    assert_eq!(hub[1].count, 2);
    assert_eq!(hub[1].url, format!("{SITE}/explore/livermore/"));
    assert_eq!(hub[1].top_tags[0].slug, "wine-tasting");
}

#[tokio::test]
async fn city_review_count_sums_published_listings() {
    let dir = MemoryDirectory::new();
    dir.listing("a").area("dublin").reviews(12).insert();
    dir.listing("b").area("dublin").reviews(30).insert();
    dir.listing("c").area("dublin").insert();
    dir.listing("d").area("dublin").reviews(100).draft().insert();
    let (explore, _) = loader(&dir);

    let total = explore
        .query()
        .get_city_review_count("dublin")
        .await
        .expect("reviews");
    assert_eq!(total, 42);
}

#[tokio::test]
async fn rating_sort_puts_unrated_listings_last() {
    let dir = MemoryDirectory::new();
    let good = dir.listing("good").title("Good").area("dublin").rating(4.5).insert();
    let none = dir.listing("none").title("Unrated").area("dublin").insert();
    let best = dir.listing("best").title("Best").area("dublin").rating(4.9).insert();
    let (explore, _) = loader(&dir);

    let page = explore
        .query()
        .get_city("dublin", 1, SortKey::Rating)
        .await
        .expect("page");

    assert_eq!(ids(&page), vec![best, good, none]);
    assert_eq!(page.total, 3);
    assert_eq!(page.pages, 1);
    assert_eq!(page.businesses[0].rating, 4.9);
    assert_eq!(page.businesses[2].rating, 0.0);
}

#[test]
fn unknown_sort_falls_back_to_rating() {
    assert_eq!(ExploreQuery::validate_sort("price_desc"), SortKey::Rating);
    assert_eq!(ExploreQuery::validate_sort("NAME"), SortKey::Name);
}

#[tokio::test]
async fn unknown_area_yields_empty_page_without_listing_query() {
    let dir = MemoryDirectory::new();
    let (explore, _) = loader(&dir);

    let page = explore
        .query()
        .get_city("atlantis", 1, SortKey::Rating)
        .await
        .expect("page");

    assert!(page.businesses.is_empty());
    assert_eq!(page.total, 0);
    assert_eq!(page.pages, 0);
    assert_eq!(Calls::get(&dir.calls.list_listings), 0);
}

#[tokio::test]
async fn cards_carry_terms_from_a_single_batch() {
    let dir = MemoryDirectory::new();
    for slug in ["a", "b", "c"] {
        dir.listing(slug)
            .area("dublin")
            .tag("brewery")
            .category("food-and-drink")
            .insert();
    }
    let (explore, _) = loader(&dir);

    let page = explore
        .query()
        .get_intersection("dublin", "brewery", 1, SortKey::Name)
        .await
        .expect("page");

    assert_eq!(page.businesses.len(), 3);
    assert_eq!(Calls::get(&dir.calls.term_batches), 1);
    let card = &page.businesses[0];
    assert_eq!(card.areas, vec!["Dublin".to_string()]);
    assert_eq!(card.categories, vec!["Food And Drink".to_string()]);
    assert_eq!(card.tags[0].slug, "brewery");
    assert_eq!(card.permalink, format!("{SITE}/places/a/"));
}

#[tokio::test]
async fn featured_sort_orders_featured_first_then_by_name() {
    let dir = MemoryDirectory::new();
    let alpha = dir.listing("alpha").title("Alpha").area("dublin").insert();
    let bravo = dir.listing("bravo").title("Bravo").area("dublin").insert();
    let charlie = dir.listing("charlie").title("Charlie").area("dublin").insert();
    let delta = dir.listing("delta").title("Delta").area("dublin").insert();
    dir.set_featured(&[charlie, bravo]);
    let (explore, _) = loader(&dir);

    let page = explore
        .query()
        .get_city("dublin", 1, SortKey::Featured)
        .await
        .expect("page");

    assert_eq!(ids(&page), vec![charlie, bravo, alpha, delta]);
}

#[tokio::test]
async fn featured_ordering_does_not_leak_into_later_queries() {
    let dir = MemoryDirectory::new();
    let low = dir.listing("low").title("Low").area("dublin").rating(3.0).insert();
    let high = dir.listing("high").title("High").area("dublin").rating(5.0).insert();
    dir.set_featured(&[low]);
    let (explore, _) = loader(&dir);

    let featured = explore
        .query()
        .get_city("dublin", 1, SortKey::Featured)
        .await
        .expect("featured page");
    assert_eq!(ids(&featured), vec![low, high]);

    let rated = explore
        .query()
        .get_city("dublin", 1, SortKey::Rating)
        .await
        .expect("rating page");
    assert_eq!(ids(&rated), vec![high, low]);
}

#[tokio::test]
async fn featured_pages_are_disjoint_and_complete() {
    let dir = MemoryDirectory::new();
    let mut all = BTreeSet::new();
    for slug in ["e", "d", "c", "b", "a"] {
        all.insert(dir.listing(slug).title(slug).area("dublin").insert());
    }
    let featured: Vec<i64> = all.iter().rev().take(2).copied().collect();
    dir.set_featured(&featured);
    let options = LoaderOptions {
        per_page: 2,
        ..LoaderOptions::default()
    };
    let (explore, _) = loader_with(&dir, options);

    let mut seen = BTreeSet::new();
    let mut total_pages = 0;
    for page in 1..=3 {
        let listing_page = explore
            .query()
            .get_city("dublin", page, SortKey::Featured)
            .await
            .expect("page");
        total_pages = listing_page.pages;
        for id in ids(&listing_page) {
            assert!(seen.insert(id), "listing {id} appeared on two pages");
        }
        if page == 1 {
            assert_eq!(ids(&listing_page), featured);
        }
    }

    assert_eq!(total_pages, 3);
    assert_eq!(seen, all);
}

#[tokio::test]
async fn listing_pages_past_the_end_are_empty() {
    let dir = MemoryDirectory::new();
    dir.listing("only").area("dublin").insert();
    let (explore, _) = loader(&dir);

    let page = explore
        .query()
        .get_city("dublin", 4, SortKey::Newest)
        .await
        .expect("page");

    assert!(page.businesses.is_empty());
    assert_eq!(page.page, 4);
    assert_eq!(page.total, 1);
}
