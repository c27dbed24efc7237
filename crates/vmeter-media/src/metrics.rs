//! Loudness engine metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total analyses by outcome.
    pub const ANALYSIS_TOTAL: &str = "vmeter_analysis_total";

    /// Analysis wall time in seconds.
    pub const ANALYSIS_DURATION_SECONDS: &str = "vmeter_analysis_duration_seconds";

    /// Time taken to resolve and verify the engine.
    pub const ENGINE_LOAD_SECONDS: &str = "vmeter_engine_load_seconds";
}

/// Record a finished analysis.
pub fn record_analysis(outcome: &str, duration_secs: f64) {
    counter!(names::ANALYSIS_TOTAL, "outcome" => outcome.to_string()).increment(1);
    histogram!(names::ANALYSIS_DURATION_SECONDS, "outcome" => outcome.to_string()).record(duration_secs);
}

/// Record a successful engine load.
pub fn record_engine_load(duration_secs: f64) {
    histogram!(names::ENGINE_LOAD_SECONDS).record(duration_secs);
}
