//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use vmeter_media::{EngineConfig, FfmpegAnalyzer, LoudnessAnalyzer};
use vmeter_postgrest::{InMemoryPresetRepository, PostgrestError, PostgrestPresetRepository, PresetRepository};
use vmeter_storage::{StorageClient, VideoStore};

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::gate::AnalysisGate;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub analyzer: Arc<dyn LoudnessAnalyzer>,
    pub presets: Arc<dyn PresetRepository>,
    /// Absent when no storage backend is configured
    pub videos: Option<Arc<dyn VideoStore>>,
    pub gate: AnalysisGate,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        analyzer: Arc<dyn LoudnessAnalyzer>,
        presets: Arc<dyn PresetRepository>,
        videos: Option<Arc<dyn VideoStore>>,
    ) -> Self {
        Self {
            config,
            analyzer,
            presets,
            videos,
            gate: AnalysisGate::new(),
        }
    }

    /// Build state from environment variables.
    ///
    /// Without Supabase settings, presets are kept in memory and uploads
    /// are disabled.
    pub fn from_env(config: ApiConfig) -> ApiResult<Self> {
        let analyzer = Arc::new(FfmpegAnalyzer::new(EngineConfig::from_env()));

        let presets: Arc<dyn PresetRepository> = match PostgrestPresetRepository::from_env() {
            Ok(repo) => {
                info!("Using PostgREST preset repository");
                Arc::new(repo)
            }
            Err(PostgrestError::NotConfigured(reason)) => {
                warn!("{}; presets are kept in memory", reason);
                Arc::new(InMemoryPresetRepository::new())
            }
            Err(e) => return Err(e.into()),
        };

        let videos: Option<Arc<dyn VideoStore>> = match StorageClient::from_env() {
            Ok(client) => {
                info!(bucket = client.bucket(), "Video uploads enabled");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!("Video uploads disabled: {}", e);
                None
            }
        };

        Ok(Self::new(config, analyzer, presets, videos))
    }
}
