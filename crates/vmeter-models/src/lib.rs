//! Shared data models for the vmeter loudness service.
//!
//! This crate provides Serde-serializable types for:
//! - Loudness measurements and target windows
//! - Target comparison and per-preset reports
//! - Loudness presets and preset queries
//! - Uploaded video naming

pub mod error;
pub mod loudness;
pub mod preset;
pub mod report;
pub mod upload;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use loudness::{is_within_target, LoudnessMeasurement, LoudnessTarget};
pub use preset::{NewPreset, Preset, PresetId, PresetQuery, PresetScope, PresetUpdate};
pub use report::{ChannelReport, LoudnessReport, TargetVerdict, METER_CEILING_LUFS, METER_FLOOR_LUFS};
pub use upload::{storage_file_name, storage_object_path, UploadedVideo, VIDEOS_PREFIX};
