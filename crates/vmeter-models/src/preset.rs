//! Loudness presets.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::loudness::LoudnessTarget;

/// Lowest accepted preset target in LUFS.
const MIN_TARGET_LUFS: f64 = -70.0;
/// Highest accepted preset target in LUFS.
const MAX_TARGET_LUFS: f64 = 0.0;
/// Widest accepted tolerance in dB.
const MAX_TOLERANCE_DB: f64 = 20.0;

/// Unique identifier for a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetId(pub Uuid);

impl PresetId {
    /// Generate a new random preset ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PresetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PresetId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A named target/tolerance configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    /// Target loudness in LUFS
    pub target: f64,
    /// Allowed deviation in dB
    pub tolerance: f64,
    /// Whether the preset expects a mono-compatibility check
    #[serde(default)]
    pub is_mono_check: bool,
    /// Owner user ID
    pub created_by: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Preset {
    /// Target window for comparisons.
    pub fn loudness_target(&self) -> LoudnessTarget {
        LoudnessTarget {
            target: self.target,
            tolerance: self.tolerance,
        }
    }

    /// Check if a user may see this preset.
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        self.is_public || self.created_by == user_id
    }
}

/// Payload for creating a preset.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPreset {
    /// Client-generated ID; assigned when absent
    #[serde(default)]
    pub id: Option<PresetId>,

    #[validate(length(min = 1, max = 100), custom(function = "validate_name"))]
    pub name: String,

    #[validate(custom(function = "validate_target"))]
    pub target: f64,

    #[validate(custom(function = "validate_tolerance"))]
    pub tolerance: f64,

    #[serde(default)]
    pub is_mono_check: bool,

    #[serde(default)]
    pub is_public: bool,

    #[validate(length(min = 1, max = 128))]
    pub created_by: String,
}

impl NewPreset {
    /// Materialize the preset, assigning an ID and creation time.
    pub fn into_preset(self) -> Preset {
        Preset {
            id: self.id.unwrap_or_default(),
            name: self.name.trim().to_string(),
            target: self.target,
            tolerance: self.tolerance,
            is_mono_check: self.is_mono_check,
            created_by: self.created_by,
            is_public: self.is_public,
            created_at: Some(Utc::now()),
        }
    }
}

/// Partial preset update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PresetUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100), custom(function = "validate_name"))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_target"))]
    pub target: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_tolerance"))]
    pub tolerance: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mono_check: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl PresetUpdate {
    /// Update that makes a preset public.
    pub fn share() -> Self {
        Self {
            is_public: Some(true),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.target.is_none()
            && self.tolerance.is_none()
            && self.is_mono_check.is_none()
            && self.is_public.is_none()
    }

    /// Apply the present fields to a preset.
    pub fn apply_to(&self, preset: &mut Preset) {
        if let Some(name) = &self.name {
            preset.name = name.trim().to_string();
        }
        if let Some(target) = self.target {
            preset.target = target;
        }
        if let Some(tolerance) = self.tolerance {
            preset.tolerance = tolerance;
        }
        if let Some(mono) = self.is_mono_check {
            preset.is_mono_check = mono;
        }
        if let Some(public) = self.is_public {
            preset.is_public = public;
        }
    }
}

/// Query parameters for listing presets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    /// Only the literal `true` enables public presets
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub include_public: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(text) => text == "true",
    })
}

/// Which presets a listing returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetScope {
    /// Presets owned by the user plus every public preset
    OwnedOrPublic(String),
    /// Presets owned by the user
    Owned(String),
    /// Public presets only
    PublicOnly,
    /// Nothing; no backend call needed
    Empty,
}

impl PresetQuery {
    pub fn scope(&self) -> PresetScope {
        let user = self
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        match (user, self.include_public) {
            (Some(user), true) => PresetScope::OwnedOrPublic(user),
            (Some(user), false) => PresetScope::Owned(user),
            (None, true) => PresetScope::PublicOnly,
            (None, false) => PresetScope::Empty,
        }
    }
}

impl PresetScope {
    /// Check whether a preset falls inside this scope.
    pub fn matches(&self, preset: &Preset) -> bool {
        match self {
            PresetScope::OwnedOrPublic(user) => preset.is_visible_to(user),
            PresetScope::Owned(user) => preset.created_by == *user,
            PresetScope::PublicOnly => preset.is_public,
            PresetScope::Empty => false,
        }
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("blank_name"));
    }
    Ok(())
}

fn validate_target(target: f64) -> Result<(), ValidationError> {
    if !target.is_finite() || !(MIN_TARGET_LUFS..=MAX_TARGET_LUFS).contains(&target) {
        return Err(ValidationError::new("target_out_of_range"));
    }
    Ok(())
}

fn validate_tolerance(tolerance: f64) -> Result<(), ValidationError> {
    if !tolerance.is_finite() || tolerance <= 0.0 || tolerance > MAX_TOLERANCE_DB {
        return Err(ValidationError::new("tolerance_out_of_range"));
    }
    Ok(())
}
