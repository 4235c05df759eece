//! Prometheus metrics for the product search subsystem.
//!
//! Everything is registered in a crate-level registry so the host service can
//! expose it next to its own metrics:
//! - Query outcomes and latency per backend
//! - Degraded (catalog fallback) searches
//! - Index writes from the synchronizer and reconciliation
//! - Background queue depth and drops
//! - Analytics recording
//!
//! # Example
//! ```no_run
//! use catalog_search::metrics::{init_metrics, gather_metrics, SEARCH_DEGRADED_TOTAL};
//!
//! init_metrics().ok();
//! SEARCH_DEGRADED_TOTAL.with_label_values(&["timeout"]).inc();
//! println!("{}", gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "catalog_search";

lazy_static! {
    /// Registry for all search metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Read path
    // ============================================================================

    /// Search requests handled
    ///
    /// Labels: backend, outcome (success, degraded, rejected, unavailable)
    pub static ref SEARCH_QUERIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("queries_total", "Total number of search requests")
            .namespace(NAMESPACE),
        &["backend", "outcome"]
    ).expect("Failed to create SEARCH_QUERIES_TOTAL metric");

    /// End-to-end search latency in seconds, fallback included
    ///
    /// Labels: backend
    pub static ref SEARCH_QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("query_duration_seconds", "Search request duration in seconds")
            .namespace(NAMESPACE)
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["backend"]
    ).expect("Failed to create SEARCH_QUERY_DURATION_SECONDS metric");

    /// Searches answered from the catalog because the index failed
    ///
    /// Labels: reason (error kind that triggered the fallback)
    pub static ref SEARCH_DEGRADED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("degraded_total", "Total number of degraded-mode searches")
            .namespace(NAMESPACE),
        &["reason"]
    ).expect("Failed to create SEARCH_DEGRADED_TOTAL metric");

    /// Suggestion requests
    ///
    /// Labels: backend, outcome
    pub static ref SEARCH_SUGGESTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("suggestions_total", "Total number of suggestion requests")
            .namespace(NAMESPACE),
        &["backend", "outcome"]
    ).expect("Failed to create SEARCH_SUGGESTIONS_TOTAL metric");

    // ============================================================================
    // Write path
    // ============================================================================

    /// Index write operations
    ///
    /// Labels: backend, operation (index, bulk_index, delete), status
    pub static ref INDEX_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("index_operations_total", "Total number of index write operations")
            .namespace(NAMESPACE),
        &["backend", "operation", "status"]
    ).expect("Failed to create INDEX_OPERATIONS_TOTAL metric");

    /// Reconciliation runs
    ///
    /// Labels: status (completed, failed)
    pub static ref RECONCILIATION_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("reconciliation_runs_total", "Total number of reconciliation runs")
            .namespace(NAMESPACE),
        &["status"]
    ).expect("Failed to create RECONCILIATION_RUNS_TOTAL metric");

    /// Documents processed by reconciliation
    ///
    /// Labels: status (indexed, failed)
    pub static ref RECONCILIATION_DOCUMENTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("reconciliation_documents_total", "Documents processed by reconciliation")
            .namespace(NAMESPACE),
        &["status"]
    ).expect("Failed to create RECONCILIATION_DOCUMENTS_TOTAL metric");

    // ============================================================================
    // Background work
    // ============================================================================

    /// Tasks waiting in a bounded queue
    ///
    /// Labels: queue
    pub static ref DISPATCH_QUEUE_DEPTH: GaugeVec = GaugeVec::new(
        Opts::new("dispatch_queue_depth", "Tasks waiting in a background queue")
            .namespace(NAMESPACE),
        &["queue"]
    ).expect("Failed to create DISPATCH_QUEUE_DEPTH metric");

    /// Tasks rejected because a queue was full or closed
    ///
    /// Labels: queue, reason (full, closed)
    pub static ref DISPATCH_DROPPED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("dispatch_dropped_total", "Tasks dropped by a background queue")
            .namespace(NAMESPACE),
        &["queue", "reason"]
    ).expect("Failed to create DISPATCH_DROPPED_TOTAL metric");

    /// Analytics records
    ///
    /// Labels: status (recorded, skipped, failed)
    pub static ref ANALYTICS_RECORDS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("analytics_records_total", "Search analytics records")
            .namespace(NAMESPACE),
        &["status"]
    ).expect("Failed to create ANALYTICS_RECORDS_TOTAL metric");
}

/// Register every metric with [`PROMETHEUS_REGISTRY`].
///
/// Calling this more than once is harmless.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SEARCH_QUERIES_TOTAL.clone()),
        Box::new(SEARCH_QUERY_DURATION_SECONDS.clone()),
        Box::new(SEARCH_DEGRADED_TOTAL.clone()),
        Box::new(SEARCH_SUGGESTIONS_TOTAL.clone()),
        Box::new(INDEX_OPERATIONS_TOTAL.clone()),
        Box::new(RECONCILIATION_RUNS_TOTAL.clone()),
        Box::new(RECONCILIATION_DOCUMENTS_TOTAL.clone()),
        Box::new(DISPATCH_QUEUE_DEPTH.clone()),
        Box::new(DISPATCH_DROPPED_TOTAL.clone()),
        Box::new(ANALYTICS_RECORDS_TOTAL.clone()),
    ];

    for collector in collectors {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Record the outcome of an index write
pub fn record_index_operation(backend: &str, operation: &str, success: bool) {
    let status = if success { "success" } else { "error" };
    INDEX_OPERATIONS_TOTAL
        .with_label_values(&[backend, operation, status])
        .inc();
}

/// Export all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
