//! Preset API handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;
use validator::Validate;

use vmeter_models::{NewPreset, Preset, PresetId, PresetQuery, PresetUpdate};

use crate::error::ApiResult;
use crate::state::AppState;

/// Preset listing response.
#[derive(Serialize)]
pub struct PresetListResponse {
    pub presets: Vec<Preset>,
}

/// Single preset response.
#[derive(Serialize)]
pub struct PresetResponse {
    pub preset: Preset,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// List presets visible to a user.
///
/// `?userId=U&includePublic=true` returns U's presets plus public ones;
/// without a user only public presets are returned, and only when asked for.
pub async fn list_presets(
    State(state): State<AppState>,
    Query(query): Query<PresetQuery>,
) -> ApiResult<Json<PresetListResponse>> {
    let presets = state.presets.list(&query).await?;
    Ok(Json(PresetListResponse { presets }))
}

/// Create a preset.
pub async fn create_preset(
    State(state): State<AppState>,
    Json(request): Json<NewPreset>,
) -> ApiResult<(StatusCode, Json<PresetResponse>)> {
    request.validate()?;

    let preset = state.presets.create(request.into_preset()).await?;
    info!(preset_id = %preset.id, name = %preset.name, "Preset created");

    Ok((StatusCode::CREATED, Json(PresetResponse { preset })))
}

/// Get a preset by ID.
pub async fn get_preset(State(state): State<AppState>, Path(id): Path<PresetId>) -> ApiResult<Json<Preset>> {
    Ok(Json(state.presets.get(&id).await?))
}

/// Update a preset. Absent fields are left unchanged.
pub async fn update_preset(
    State(state): State<AppState>,
    Path(id): Path<PresetId>,
    Json(update): Json<PresetUpdate>,
) -> ApiResult<Json<PresetResponse>> {
    update.validate()?;

    let preset = state.presets.update(&id, &update).await?;
    Ok(Json(PresetResponse { preset }))
}

/// Delete a preset.
pub async fn delete_preset(State(state): State<AppState>, Path(id): Path<PresetId>) -> ApiResult<Json<SuccessResponse>> {
    state.presets.delete(&id).await?;
    info!(preset_id = %id, "Preset deleted");
    Ok(Json(SuccessResponse { success: true }))
}

/// Make a preset public.
pub async fn share_preset(State(state): State<AppState>, Path(id): Path<PresetId>) -> ApiResult<Json<PresetResponse>> {
    let preset = state.presets.share(&id).await?;
    info!(preset_id = %id, "Preset shared");
    Ok(Json(PresetResponse { preset }))
}
