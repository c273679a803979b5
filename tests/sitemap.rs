//! Geo sitemap batching and the explore URL list.

mod support;

use bizdir::application::loader::LoaderOptions;
use bizdir::application::sitemap::{SitemapEntry, render_urlset};

use support::{Calls, MemoryDirectory, SITE, loader, loader_with};

fn seed_located(dir: &MemoryDirectory, count: usize) {
    for index in 0..count {
        dir.listing(&format!("place-{index}"))
            .area("dublin")
            .at(37.70 + index as f64 * 0.0001, -121.93)
            .insert();
    }
}

#[tokio::test]
async fn exactly_one_full_batch_takes_two_fetches() {
    let dir = MemoryDirectory::new();
    seed_located(&dir, 500);
    let (explore, _) = loader(&dir);

    let xml = explore.sitemap().generate_geositemap().await.expect("geo sitemap");

    assert_eq!(Calls::get(&dir.calls.geo_batches), 2);
    assert_eq!(xml.matches("<url>").count(), 500);
}

#[tokio::test]
async fn short_batches_stop_after_one_fetch() {
    let dir = MemoryDirectory::new();
    seed_located(&dir, 3);
    let (explore, _) = loader(&dir);

    explore.sitemap().generate_geositemap().await.expect("geo sitemap");
    assert_eq!(Calls::get(&dir.calls.geo_batches), 1);
}

#[tokio::test]
async fn small_batch_size_pages_through_everything() {
    let dir = MemoryDirectory::new();
    seed_located(&dir, 7);
    let options = LoaderOptions {
        geo_batch_size: 3,
        ..LoaderOptions::default()
    };
    let (explore, _) = loader_with(&dir, options);

    let xml = explore.sitemap().generate_geositemap().await.expect("geo sitemap");

    assert_eq!(Calls::get(&dir.calls.geo_batches), 3);
    assert_eq!(xml.matches("<geo:geo>").count(), 7);
}

#[tokio::test]
async fn listings_without_real_coordinates_are_skipped() {
    let dir = MemoryDirectory::new();
    dir.listing("mapped").area("dublin").at(37.7022, -121.9358).insert();
    dir.listing("null-island").area("dublin").at(0.0, 0.0).insert();
    dir.listing("unmapped").area("dublin").insert();
    dir.listing("hidden").area("dublin").at(37.1, -121.1).draft().insert();
    let (explore, _) = loader(&dir);

    let xml = explore.sitemap().generate_geositemap().await.expect("geo sitemap");

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("xmlns:geo=\"http://www.google.com/geo/schemas/sitemap/1.0\""));
    assert!(xml.contains(&format!("<loc>{SITE}/places/mapped/</loc>")));
    assert!(xml.contains("<geo:format>kml</geo:format>"));
    assert!(xml.contains("<geo:lat>37.7022</geo:lat>"));
    assert!(xml.contains("<geo:long>-121.9358</geo:long>"));
    assert!(xml.contains("<lastmod>2024-01-01T00:00:01+00:00</lastmod>"));
    assert!(!xml.contains("null-island"));
    assert!(!xml.contains("unmapped"));
    assert!(!xml.contains("hidden"));
    assert_eq!(xml.matches("<url>").count(), 1);
}

#[tokio::test]
async fn geo_sitemap_is_cached_until_a_listing_changes() {
    let dir = MemoryDirectory::new();
    let first = dir.listing("a").area("dublin").at(37.7, -121.9).insert();
    dir.listing("b").area("dublin").at(37.8, -121.8).insert();
    let (explore, _) = loader(&dir);

    explore.sitemap().generate_geositemap().await.expect("geo sitemap");
    explore.sitemap().generate_geositemap().await.expect("geo sitemap");
    assert_eq!(Calls::get(&dir.calls.geo_batches), 1);

    explore.directory().trash_listing(first).await.expect("trash");
    let xml = explore.sitemap().generate_geositemap().await.expect("geo sitemap");

    assert_eq!(Calls::get(&dir.calls.geo_batches), 2);
    assert_eq!(xml.matches("<url>").count(), 1);
}

#[tokio::test]
async fn explore_urls_list_hub_then_areas_then_intersections() {
    let dir = MemoryDirectory::new();
    dir.listing("a").area("livermore").tag("wine-tasting").insert();
    dir.listing("b").area("livermore").tag("wine-tasting").insert();
    dir.listing("c").area("dublin").tag("brewery").insert();
    dir.listing("d").area("dublin").tag("brewery").insert();
    dir.listing("e").area("dublin").tag("hiking").insert();
    let (explore, _) = loader(&dir);

    let entries = explore.sitemap().get_explore_urls().await.expect("urls");

    let locs: Vec<&str> = entries.iter().map(|entry| entry.loc.as_str()).collect();
    assert_eq!(
        locs,
        vec![
            "https://dir.example/explore/",
            "https://dir.example/explore/dublin/",
            "https://dir.example/explore/livermore/",
            "https://dir.example/explore/dublin/brewery/",
            "https://dir.example/explore/livermore/wine-tasting/",
        ]
    );

    assert_eq!(entries[0].lastmod, "2024-01-01T00:00:04+00:00");
    assert_eq!(entries[1].lastmod, "2024-01-01T00:00:04+00:00");
    assert_eq!(entries[2].lastmod, "2024-01-01T00:00:02+00:00");
    assert_eq!(entries[3].lastmod, "2024-01-01T00:00:04+00:00");
}

#[tokio::test]
async fn area_without_qualifying_intersection_has_no_lastmod() {
    let dir = MemoryDirectory::new();
    dir.listing("a").area("sunol").tag("hiking").insert();
    let (explore, _) = loader(&dir);

    let entries = explore.sitemap().get_explore_urls().await.expect("urls");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].lastmod, "");
    assert_eq!(entries[1].loc, format!("{SITE}/explore/sunol/"));
    assert_eq!(entries[1].lastmod, "");
}

#[tokio::test]
async fn provider_pages_cover_the_url_list() {
    let dir = MemoryDirectory::new();
    dir.listing("a").area("dublin").tag("brewery").insert();
    dir.listing("b").area("dublin").tag("brewery").insert();
    let (explore, _) = loader(&dir);
    let sitemap = explore.sitemap();

    assert_eq!(sitemap.max_num_pages().await.expect("pages"), 1);
    assert_eq!(sitemap.url_list(1).await.expect("page").len(), 3);
    assert!(sitemap.url_list(2).await.expect("page").is_empty());
    assert_eq!(explore.total_explore_pages().await.expect("total"), 3);
}

#[test]
fn urlset_escapes_locations_and_omits_empty_lastmod() {
    let xml = render_urlset(&[
        SitemapEntry {
            loc: "https://dir.example/explore/?a=1&b=2".to_string(),
            lastmod: String::new(),
        },
        SitemapEntry {
            loc: "https://dir.example/explore/dublin/".to_string(),
            lastmod: "2024-01-01T00:00:00+00:00".to_string(),
        },
    ]);

    assert!(xml.contains("<loc>https://dir.example/explore/?a=1&amp;b=2</loc></url>"));
    assert!(xml.contains("<lastmod>2024-01-01T00:00:00+00:00</lastmod>"));
    assert!(xml.trim_end().ends_with("</urlset>"));
}
