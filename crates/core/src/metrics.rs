//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Feed fetches (results, latency)
//! - Sink deliveries
//! - Batches and the row filter
//! - Registry refreshes

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Feed
// =============================================================================

/// Feed fetches total by kind and result.
pub static FETCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stagefeed_fetches_total", "Total feed fetches"),
        &["kind", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Feed fetch duration in seconds.
pub static FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("stagefeed_fetch_duration_seconds", "Duration of feed fetches")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Export
// =============================================================================

/// Sink deliveries total by sink and result.
pub static SINK_DELIVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stagefeed_sink_deliveries_total", "Total sink deliveries"),
        &["sink", "result"],
    )
    .unwrap()
});

/// Data rows dropped by the racing number filter.
pub static ROWS_FILTERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "stagefeed_rows_filtered_total",
        "Data rows dropped by the racing number filter",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator
// =============================================================================

/// Batches total by result.
pub static BATCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stagefeed_batches_total", "Total fetch batches"),
        &["result"], // "complete", "partial", "rejected"
    )
    .unwrap()
});

/// Tasks per batch.
pub static BATCH_TASKS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("stagefeed_batch_tasks", "Number of tasks per batch")
            .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0]),
    )
    .unwrap()
});

// =============================================================================
// Registry
// =============================================================================

/// Registry refreshes total by result.
pub static REGISTRY_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stagefeed_registry_refreshes_total", "Total registry refreshes"),
        &["result"], // "updated", "empty", "error"
    )
    .unwrap()
});

/// Every core metric, for registration with a Prometheus registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(FETCHES_TOTAL.clone()),
        Box::new(FETCH_DURATION.clone()),
        Box::new(SINK_DELIVERIES.clone()),
        Box::new(ROWS_FILTERED.clone()),
        Box::new(BATCHES_TOTAL.clone()),
        Box::new(BATCH_TASKS.clone()),
        Box::new(REGISTRY_REFRESHES.clone()),
    ]
}
