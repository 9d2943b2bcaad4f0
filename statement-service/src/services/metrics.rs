//! Prometheus metrics for statement-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, register_int_counter,
    CounterVec, Histogram, HistogramVec, IntCounter, TextEncoder,
};

/// Statements computed by create or edit (ripple recomputations excluded).
pub static STATEMENTS_COMPUTED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statement_statements_computed_total",
        "Total number of statements computed",
        &["operation"] // create, edit
    )
    .expect("Failed to register statements_computed")
});

/// Ripple passes by outcome.
pub static RIPPLE_PASSES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statement_ripple_passes_total",
        "Total number of ripple passes",
        &["status"] // ok, error
    )
    .expect("Failed to register ripple_passes_total")
});

/// Statements rewritten per ripple pass.
pub static RIPPLE_LENGTH: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "statement_ripple_length",
        "Number of statements recomputed by one ripple pass",
        vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0]
    )
    .expect("Failed to register ripple_length")
});

pub static REPORTS_GENERATED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "statement_reports_generated_total",
        "Total number of period reports generated"
    )
    .expect("Failed to register reports_generated")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statement_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "statement_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&STATEMENTS_COMPUTED);
    Lazy::force(&RIPPLE_PASSES_TOTAL);
    Lazy::force(&RIPPLE_LENGTH);
    Lazy::force(&REPORTS_GENERATED);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
