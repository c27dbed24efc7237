//! Uploaded video naming.

use serde::{Deserialize, Serialize};

/// Key prefix for uploaded videos inside the storage bucket.
pub const VIDEOS_PREFIX: &str = "videos";

/// Result of a successful video upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedVideo {
    pub success: bool,
    /// Public URL of the stored object
    pub url: String,
    /// Stored file name (`{millis}_{original}`)
    pub file_name: String,
}

/// Build the stored file name for an upload.
///
/// Path separators and control characters in the client-supplied name are
/// replaced with `_` so the result is always a single key segment.
pub fn storage_file_name(timestamp_millis: i64, original_name: &str) -> String {
    let cleaned: String = original_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    let cleaned = if cleaned.is_empty() { "upload" } else { cleaned };

    format!("{}_{}", timestamp_millis, cleaned)
}

/// Object path for a stored file name.
pub fn storage_object_path(file_name: &str) -> String {
    format!("{}/{}", VIDEOS_PREFIX, file_name)
}
