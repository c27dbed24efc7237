//! Axum HTTP API server.
//!
//! This crate provides:
//! - Loudness analysis of uploaded media, guarded by a busy flag
//! - Preset CRUD and sharing
//! - Video upload to object storage
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use gate::{AnalysisGate, AnalysisPermit};
pub use routes::create_router;
pub use state::AppState;
