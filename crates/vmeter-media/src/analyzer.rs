//! Loudness analyzer seam.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use vmeter_models::LoudnessMeasurement;

use crate::engine::{get_engine, EngineConfig, FfmpegEngine};
use crate::error::MediaResult;

/// Measures the loudness of uploaded media.
#[async_trait]
pub trait LoudnessAnalyzer: Send + Sync {
    /// Analyze one media blob.
    async fn analyze(&self, media: Bytes) -> MediaResult<LoudnessMeasurement>;

    /// Version string of the underlying engine, loading it if needed.
    async fn engine_version(&self) -> MediaResult<String>;

    /// Whether the engine has been loaded already.
    fn is_ready(&self) -> bool;
}

/// Analyzer backed by the process-wide FFmpeg engine.
#[derive(Debug, Clone, Default)]
pub struct FfmpegAnalyzer {
    config: EngineConfig,
}

impl FfmpegAnalyzer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    async fn engine(&self) -> MediaResult<Arc<FfmpegEngine>> {
        get_engine(&self.config).await
    }
}

#[async_trait]
impl LoudnessAnalyzer for FfmpegAnalyzer {
    async fn analyze(&self, media: Bytes) -> MediaResult<LoudnessMeasurement> {
        let engine = self.engine().await?;
        engine.analyze(&media).await
    }

    async fn engine_version(&self) -> MediaResult<String> {
        Ok(self.engine().await?.version().to_string())
    }

    fn is_ready(&self) -> bool {
        crate::engine::engine_loaded()
    }
}
