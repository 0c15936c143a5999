//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all PaperDesk metrics
pub const METRICS_PREFIX: &str = "paperdesk";

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    describe_counter!(
        format!("{}_search_conditions_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Filter conditions skipped as malformed"
    );

    // Import metrics
    describe_counter!(
        format!("{}_import_rows_total", METRICS_PREFIX),
        Unit::Count,
        "Total rows seen by the import pipeline"
    );

    describe_counter!(
        format!("{}_import_rows_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Rows rejected by the import pipeline"
    );

    describe_histogram!(
        format!("{}_import_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Import batch latency in seconds"
    );

    // Storage metrics
    describe_counter!(
        format!("{}_pdf_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "PDF files uploaded to object storage"
    );
}

/// Record a completed search
pub fn record_search(duration_secs: f64, kind: &str, result_count: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX), "kind" => kind.to_string())
        .increment(1);
    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Record skipped filter conditions
pub fn record_skipped_conditions(count: usize) {
    if count > 0 {
        counter!(format!("{}_search_conditions_skipped_total", METRICS_PREFIX))
            .increment(count as u64);
    }
}

/// Record an import batch
pub fn record_import(total_rows: usize, failed_rows: usize, duration_secs: f64) {
    counter!(format!("{}_import_rows_total", METRICS_PREFIX)).increment(total_rows as u64);
    counter!(format!("{}_import_rows_failed_total", METRICS_PREFIX)).increment(failed_rows as u64);
    histogram!(format!("{}_import_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a PDF upload
pub fn record_pdf_upload() {
    counter!(format!("{}_pdf_uploads_total", METRICS_PREFIX)).increment(1);
}
