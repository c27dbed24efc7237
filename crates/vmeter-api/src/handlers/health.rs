//! Health check handlers.

use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub engine: CheckStatus,
    pub presets: CheckStatus,
    pub storage: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(start: Instant, detail: Option<String>) -> Self {
        Self {
            status: "ok".to_string(),
            detail,
            error: None,
            latency_ms: Some(saturating_millis(start.elapsed())),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: None,
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn disabled() -> Self {
        Self {
            status: "disabled".to_string(),
            detail: None,
            error: None,
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Whole milliseconds, clamped to `u64::MAX`.
fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Readiness check endpoint (readiness probe).
///
/// Loads the engine if needed and pings the preset backend. Storage is
/// optional and never fails readiness.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let engine = {
        let start = Instant::now();
        match state.analyzer.engine_version().await {
            Ok(version) => CheckStatus::ok(start, Some(version)),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let presets = {
        let start = Instant::now();
        match state.presets.health_check().await {
            Ok(()) => CheckStatus::ok(start, Some(state.presets.backend_name().to_string())),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let storage = match &state.videos {
        Some(_) => CheckStatus::ok(Instant::now(), None),
        None => CheckStatus::disabled(),
    };

    let all_ok = engine.is_ok() && presets.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            engine,
            presets,
            storage,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
