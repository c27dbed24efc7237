//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Install the Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vmeter_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vmeter_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vmeter_http_requests_in_flight";

    // Analysis gate
    pub const ANALYSIS_REJECTED_TOTAL: &str = "vmeter_analysis_rejected_total";

    // Uploads
    pub const UPLOADS_TOTAL: &str = "vmeter_uploads_total";
    pub const UPLOAD_BYTES: &str = "vmeter_upload_bytes";
    pub const UPLOAD_DURATION_SECONDS: &str = "vmeter_upload_duration_seconds";

    // Rate limiting
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vmeter_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an analysis refused because another one was running.
pub fn record_analysis_rejected() {
    counter!(names::ANALYSIS_REJECTED_TOTAL).increment(1);
}

/// Record a stored upload.
pub fn record_upload(bytes: usize, duration_secs: f64) {
    counter!(names::UPLOADS_TOTAL).increment(1);
    histogram!(names::UPLOAD_BYTES).record(bytes as f64);
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static UUID_RE: OnceLock<Regex> = OnceLock::new();
static NUMERIC_RE: OnceLock<Regex> = OnceLock::new();

/// Collapse IDs in a path so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let uuid = UUID_RE.get_or_init(|| {
        Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
            .expect("uuid pattern is valid")
    });
    let numeric = NUMERIC_RE.get_or_init(|| Regex::new(r"/[0-9]+(/|$)").expect("numeric pattern is valid"));

    let path = uuid.replace_all(path, ":id");
    numeric.replace_all(&path, "/:id$1").to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());

    response
}
