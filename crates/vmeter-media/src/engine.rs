//! Process-wide FFmpeg engine.
//!
//! The engine is resolved and verified once, on first demand, and then held
//! for the life of the process. Concurrent first callers share a single load.
//! A failed load is not cached, so a later call tries again.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;
use tracing::{info, warn};
use vmeter_models::LoudnessMeasurement;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::EbuR128Filter;
use crate::metrics;
use crate::parser::{EbuR128LogParser, LoudnessLogParser};

/// Fixed name the media is written under inside the scratch directory.
pub const INPUT_FILE_NAME: &str = "input.mp4";

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// FFmpeg binary (absolute path or name looked up in PATH)
    pub ffmpeg_path: Option<PathBuf>,
    /// Parent directory for per-analysis scratch directories
    pub work_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            work_dir: std::env::var("VMETER_WORK_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    fn resolve_binary(&self) -> MediaResult<PathBuf> {
        match &self.ffmpeg_path {
            Some(path) if path.components().count() > 1 => {
                if path.is_file() {
                    Ok(path.clone())
                } else {
                    Err(MediaError::engine_unavailable(format!(
                        "FFmpeg binary not found at {}",
                        path.display()
                    )))
                }
            }
            Some(name) => which::which(name).map_err(|_| {
                MediaError::engine_unavailable(format!("{} not found in PATH", name.display()))
            }),
            None => crate::command::check_ffmpeg(),
        }
    }
}

/// A verified FFmpeg installation able to run loudness analysis.
pub struct FfmpegEngine {
    binary: PathBuf,
    version: String,
    work_dir: Option<PathBuf>,
    filter: EbuR128Filter,
    parser: Arc<dyn LoudnessLogParser>,
}

impl std::fmt::Debug for FfmpegEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEngine")
            .field("binary", &self.binary)
            .field("version", &self.version)
            .field("work_dir", &self.work_dir)
            .field("filter", &self.filter)
            .finish()
    }
}

impl FfmpegEngine {
    /// Resolve and verify the FFmpeg binary.
    pub async fn load(config: &EngineConfig) -> MediaResult<Self> {
        let start = Instant::now();
        let binary = config.resolve_binary()?;

        let output = FfmpegRunner::new(&binary)
            .run_args(&["-hide_banner".to_string(), "-version".to_string()])
            .await
            .map_err(|e| {
                MediaError::engine_unavailable(format!("failed to run {}: {}", binary.display(), e))
            })?;

        if !output.success {
            return Err(MediaError::engine_unavailable(format!(
                "{} -version exited with {:?}",
                binary.display(),
                output.exit_code
            )));
        }

        let version = output
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("ffmpeg (unknown version)")
            .to_string();

        metrics::record_engine_load(start.elapsed().as_secs_f64());
        info!(binary = %binary.display(), version = %version, "Loudness engine loaded");

        Ok(Self {
            binary,
            version,
            work_dir: config.work_dir.clone(),
            filter: EbuR128Filter::default(),
            parser: Arc::new(EbuR128LogParser),
        })
    }

    /// First line of `ffmpeg -version`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The fixed loudness measurement command, run from the scratch directory.
    pub fn loudness_command(&self) -> FfmpegCommand {
        FfmpegCommand::new(INPUT_FILE_NAME, "-")
            .no_stats()
            .audio_filter(self.filter.to_filter_string())
            .format("null")
    }

    /// Measure the loudness of one media blob.
    ///
    /// Runs to completion; there is no timeout and no way to abort.
    pub async fn analyze(&self, media: &[u8]) -> MediaResult<LoudnessMeasurement> {
        let start = Instant::now();
        let result = self.analyze_inner(media).await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(m) => {
                metrics::record_analysis("ok", elapsed);
                info!(
                    bytes = media.len(),
                    integrated = ?m.integrated(),
                    short_term = ?m.short_term(),
                    duration_ms = (elapsed * 1000.0) as u64,
                    "Loudness analysis complete"
                );
            }
            Err(e) => {
                metrics::record_analysis("failed", elapsed);
                warn!(bytes = media.len(), error = %e, "Loudness analysis failed");
            }
        }

        result
    }

    async fn analyze_inner(&self, media: &[u8]) -> MediaResult<LoudnessMeasurement> {
        let scratch = self.scratch_dir()?;
        let input = scratch.path().join(INPUT_FILE_NAME);

        tokio::fs::write(&input, media).await.map_err(|e| {
            MediaError::analysis_failed(format!("failed to write {}: {}", input.display(), e), None, None)
        })?;

        let output = FfmpegRunner::new(&self.binary)
            .in_dir(scratch.path())
            .run(&self.loudness_command())
            .await
            .map_err(|e| {
                MediaError::analysis_failed(
                    format!("failed to run {}: {}", self.binary.display(), e),
                    None,
                    None,
                )
            })?;

        if !output.success {
            let last_line = output
                .stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("unknown error")
                .trim()
                .to_string();
            return Err(MediaError::analysis_failed(
                format!("FFmpeg exited with non-zero status: {}", last_line),
                Some(output.stderr),
                output.exit_code,
            ));
        }

        Ok(self.parser.parse(&output.stderr))
    }

    fn scratch_dir(&self) -> MediaResult<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("vmeter-");
        let dir = match &self.work_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent).and_then(|_| builder.tempdir_in(parent))
            }
            None => builder.tempdir(),
        };
        dir.map_err(|e| MediaError::analysis_failed(format!("failed to create scratch dir: {}", e), None, None))
    }
}

/// Single-flight, load-once cell for a shared engine handle.
pub struct EngineCell<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> EngineCell<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Return the loaded value, running `load` only if nothing is cached.
    ///
    /// Concurrent callers wait for the in-flight load. An error is returned
    /// to the callers of that attempt and leaves the cell empty.
    pub async fn get_or_load<F, Fut>(&self, load: F) -> MediaResult<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MediaResult<T>>,
    {
        self.cell
            .get_or_try_init(|| async { load().await.map(Arc::new) })
            .await
            .map(Arc::clone)
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T> Default for EngineCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

static ENGINE: EngineCell<FfmpegEngine> = EngineCell::new();

/// Get the process-wide engine, loading it on first use.
///
/// The config of the call that performs the load wins; later configs are
/// ignored once an engine is cached.
pub async fn get_engine(config: &EngineConfig) -> MediaResult<Arc<FfmpegEngine>> {
    ENGINE.get_or_load(|| FfmpegEngine::load(config)).await
}

/// Whether the process-wide engine has been loaded.
pub fn engine_loaded() -> bool {
    ENGINE.is_loaded()
}
