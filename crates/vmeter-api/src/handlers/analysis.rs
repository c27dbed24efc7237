//! Loudness analysis handlers.

use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use vmeter_models::{LoudnessMeasurement, LoudnessReport, LoudnessTarget, PresetId};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Analysis result.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub measurement: LoudnessMeasurement,
    /// Present when a preset was selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<LoudnessReport>,
}

/// Fields read from an analysis upload.
#[derive(Default)]
struct AnalyzeForm {
    file: Option<Bytes>,
    preset_id: Option<PresetId>,
}

async fn read_analyze_form(mut multipart: Multipart) -> ApiResult<AnalyzeForm> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
                if !data.is_empty() {
                    form.file = Some(data);
                }
            }
            Some("presetId") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read presetId: {}", e)))?;
                let text = text.trim();
                if !text.is_empty() {
                    let id = Uuid::parse_str(text)
                        .map_err(|_| ApiError::bad_request(format!("Invalid presetId: {}", text)))?;
                    form.preset_id = Some(PresetId(id));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Analyze an uploaded media file.
///
/// Only one analysis runs at a time; a submission while another is in
/// progress is refused with 409.
pub async fn analyze(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<AnalyzeResponse>> {
    let Some(_permit) = state.gate.try_acquire() else {
        metrics::record_analysis_rejected();
        warn!("Analysis refused: another analysis is in progress");
        return Err(ApiError::conflict("An analysis is already in progress"));
    };

    let form = read_analyze_form(multipart).await?;
    let media = form.file.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    // Resolve the preset first so a bad ID does not cost an engine run
    let preset = match &form.preset_id {
        Some(id) => Some(state.presets.get(id).await?),
        None => None,
    };

    let bytes = media.len();
    let measurement = state.analyzer.analyze(media).await?;
    let report = preset.as_ref().map(|p| LoudnessReport::for_preset(&measurement, p));

    info!(
        bytes,
        integrated = ?measurement.integrated(),
        preset_id = ?preset.as_ref().map(|p| p.id.to_string()),
        within_target = ?report.as_ref().map(|r| r.integrated.within_target),
        "Analysis served"
    );

    Ok(Json(AnalyzeResponse { measurement, report }))
}

/// Compare known readings against a target window.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    #[serde(default)]
    pub integrated: Option<f64>,
    #[serde(default)]
    pub short_term: Option<f64>,
    pub target: f64,
    pub tolerance: f64,
}

/// Evaluate readings against a target without running the engine.
pub async fn compare(Json(request): Json<CompareRequest>) -> ApiResult<Json<LoudnessReport>> {
    let target = LoudnessTarget::new(request.target, request.tolerance)?;
    let measurement = LoudnessMeasurement::new(request.integrated, request.short_term, "");
    Ok(Json(LoudnessReport::new(&measurement, target)))
}
