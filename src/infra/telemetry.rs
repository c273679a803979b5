use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the service emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "bizdir_cache_hit_total",
            Unit::Count,
            "Explore cache hits, labelled by tier and key kind."
        );
        describe_counter!(
            "bizdir_cache_miss_total",
            Unit::Count,
            "Explore cache misses, labelled by tier and key kind."
        );
        describe_counter!(
            "bizdir_cache_evict_total",
            Unit::Count,
            "Explicit explore cache evictions, labelled by tier and key kind."
        );
        describe_counter!(
            "bizdir_cache_object_evict_total",
            Unit::Count,
            "Object tier entries displaced by capacity."
        );
        describe_gauge!(
            "bizdir_cache_event_queue_len",
            Unit::Count,
            "Pending directory change events awaiting invalidation."
        );
        describe_histogram!(
            "bizdir_cache_invalidate_ms",
            Unit::Milliseconds,
            "Latency of one invalidation batch in milliseconds."
        );
        describe_counter!(
            "bizdir_geositemap_batches_total",
            Unit::Count,
            "Batched listing fetches issued while building the geo sitemap."
        );
    });
}
