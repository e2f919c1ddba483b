//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the stagefeed server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Subscription and registry gauges (collected dynamically)
//! - Every core metric (fetches, sinks, batches, registry refreshes)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "stagefeed_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stagefeed_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "stagefeed_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Dispatch Metrics (collected dynamically)
// =============================================================================

/// Sinks subscribed per data kind.
pub static SINK_SUBSCRIPTIONS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "stagefeed_sink_subscriptions",
            "Number of sinks subscribed per data kind",
        ),
        &["kind"],
    )
    .unwrap()
});

/// Classes with a registered racing number.
pub static REGISTRY_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "stagefeed_registry_entries",
        "Number of classes currently held in the racing number registry",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Dispatch
    registry
        .register(Box::new(SINK_SUBSCRIPTIONS.clone()))
        .unwrap();
    registry
        .register(Box::new(REGISTRY_ENTRIES.clone()))
        .unwrap();

    // Core metrics (feed, sinks, batches, registry)
    for metric in stagefeed_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the live bus and registry.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    for (kind, count) in state.bus().subscription_counts() {
        SINK_SUBSCRIPTIONS
            .with_label_values(&[kind.name()])
            .set(count as i64);
    }
    REGISTRY_ENTRIES.set(state.registry().all().len() as i64);
}

/// Normalize a path for metric labels.
///
/// Drops the query string and replaces the resource key of data lookups
/// with a placeholder.
pub fn normalize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    match path.strip_prefix("/api/v1/data/") {
        Some(key) if !key.is_empty() => "/api/v1/data/{key}".to_string(),
        _ => path.to_string(),
    }
}
