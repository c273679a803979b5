mod support;

use std::collections::HashSet;

use bizdir::application::loader::LoaderOptions;
use bizdir::cache::CacheConfig;
use metrics_util::debugging::DebuggingRecorder;

use support::{MemoryDirectory, loader_with};

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let dir = MemoryDirectory::new();
    let trashed = dir
        .listing("a")
        .area("dublin")
        .tag("brewery")
        .at(37.7, -121.9)
        .insert();
    dir.listing("b").area("livermore").tag("brewery").insert();

    let options = LoaderOptions {
        cache: CacheConfig {
            object_tier_capacity: 1,
            ..CacheConfig::default()
        },
        ..LoaderOptions::default()
    };
    let (explore, _) = loader_with(&dir, options);
    let query = explore.query();

    // Misses then a hit; the second area displaces the first from the object tier.
    query.get_tags_for_area("dublin", 0).await.expect("tags");
    query.get_tags_for_area("dublin", 0).await.expect("tags");
    query.get_tags_for_area("livermore", 0).await.expect("tags");
    explore.sitemap().generate_geositemap().await.expect("geo sitemap");

    explore
        .directory()
        .trash_listing(trashed)
        .await
        .expect("trash");
    explore
        .directory()
        .delete_listing(trashed)
        .await
        .expect("delete");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "bizdir_cache_hit_total",
        "bizdir_cache_miss_total",
        "bizdir_cache_evict_total",
        "bizdir_cache_object_evict_total",
        "bizdir_cache_event_queue_len",
        "bizdir_cache_invalidate_ms",
        "bizdir_geositemap_batches_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
