//! FFmpeg CLI wrapper for loudness analysis.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - The EBU R128 measurement filter graph
//! - A process-wide, lazily loaded FFmpeg engine
//! - Loudness log parsing behind a swappable parser trait
//! - The `LoudnessAnalyzer` seam used by the HTTP layer

pub mod analyzer;
pub mod command;
pub mod engine;
pub mod error;
pub mod filters;
pub mod metrics;
pub mod parser;

pub use analyzer::{FfmpegAnalyzer, LoudnessAnalyzer};
pub use command::{check_ffmpeg, CapturedOutput, FfmpegCommand, FfmpegRunner};
pub use engine::{engine_loaded, get_engine, EngineCell, EngineConfig, FfmpegEngine, INPUT_FILE_NAME};
pub use error::{MediaError, MediaResult};
pub use filters::EbuR128Filter;
pub use parser::{EbuR128LogParser, LoudnessLogParser};
