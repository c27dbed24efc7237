//! Video upload handler.

use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use tracing::info;

use vmeter_models::{storage_file_name, UploadedVideo};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Store an uploaded video and return its public URL.
pub async fn upload_video(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<UploadedVideo>> {
    let store = state
        .videos
        .clone()
        .ok_or_else(|| ApiError::unavailable("Video storage is not configured"))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or(DEFAULT_CONTENT_TYPE).to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;

        if data.is_empty() {
            break;
        }

        let file_name = storage_file_name(Utc::now().timestamp_millis(), &original_name);
        let size = data.len();
        let start = Instant::now();

        let uploaded = store.upload(&file_name, data, &content_type).await?;

        metrics::record_upload(size, start.elapsed().as_secs_f64());
        info!(file_name = %uploaded.file_name, bytes = size, "Video uploaded");

        return Ok(Json(uploaded));
    }

    Err(ApiError::bad_request("No file uploaded"))
}
