//! Prometheus metrics for the range engine
//!
//! Process-wide counters complementing the per-instance
//! [`EngineStats`](crate::window::EngineStats) snapshots. Notably
//! `range_samples_dropped_total` makes the otherwise silent drop of
//! unresolvable samples observable.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_int_gauge, Counter, CounterVec, Encoder,
    IntGauge, TextEncoder,
};

lazy_static! {
    // === Ingestion Counters ===

    /// Samples appended to a window entry
    pub static ref SAMPLES_INGESTED_TOTAL: Counter = register_counter!(
        "range_samples_ingested_total",
        "Samples ingested into a range window"
    ).unwrap();

    /// Samples consumed without being stored
    pub static ref SAMPLES_DROPPED_TOTAL: CounterVec = register_counter_vec!(
        "range_samples_dropped_total",
        "Samples consumed but excluded from the window",
        &["reason"]
    ).unwrap();

    /// Window advances performed
    pub static ref WINDOWS_ADVANCED_TOTAL: Counter = register_counter!(
        "range_windows_advanced_total",
        "Sliding window advance operations"
    ).unwrap();

    // === Window State ===

    /// Series currently held in live windows
    pub static ref LIVE_SERIES: IntGauge = register_int_gauge!(
        "range_live_series",
        "Series entries currently inside a range window"
    ).unwrap();

    // === Buffer Pool ===

    /// Pool acquires by outcome
    pub static ref POOL_ACQUIRES_TOTAL: CounterVec = register_counter_vec!(
        "range_pool_acquires_total",
        "Point buffer acquisitions",
        &["outcome"]
    ).unwrap();
}

/// Drop reason label: fingerprint failed label resolution
pub const DROP_REASON_LABEL_PARSE: &str = "label_parse";
/// Drop reason label: sample already behind the trailing edge
pub const DROP_REASON_BEHIND_WINDOW: &str = "behind_window";
/// Drop reason label: per-window series limit reached
pub const DROP_REASON_SERIES_LIMIT: &str = "series_limit";

/// Render all registered metrics in the Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
