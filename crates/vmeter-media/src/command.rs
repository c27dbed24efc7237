//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output target (file path, or `-` for stdout)
    output: String,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Suppress periodic encoding stats
    no_stats: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl Into<String>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.into(),
            output_args: Vec::new(),
            no_stats: false,
        }
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set audio filter graph.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Set output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Suppress periodic progress stats on stderr.
    pub fn no_stats(mut self) -> Self {
        self.no_stats = true;
        self
    }

    /// Build the command arguments.
    ///
    /// The log level stays at `info`: the ebur128 summary is an info line.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-hide_banner".to_string(), "-nostdin".to_string()];

        if self.no_stats {
            args.push("-nostats".to_string());
        }

        args.push("-v".to_string());
        args.push("info".to_string());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.iter().cloned());

        args.push(self.output.clone());

        args
    }
}

/// Output captured from a finished FFmpeg process.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

/// Runs FFmpeg to completion and captures its output.
///
/// There is no timeout and no cancellation: the call returns when the
/// process exits.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: PathBuf,
    current_dir: Option<PathBuf>,
}

impl FfmpegRunner {
    /// Create a runner for the given FFmpeg binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            current_dir: None,
        }
    }

    /// Run the process from this directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> std::io::Result<CapturedOutput> {
        self.run_args(&cmd.build_args()).await
    }

    /// Run the binary with raw arguments.
    ///
    /// Only spawn and pipe failures are errors; a non-zero exit is reported
    /// through [`CapturedOutput::success`].
    pub async fn run_args(&self, args: &[String]) -> std::io::Result<CapturedOutput> {
        debug!("Running FFmpeg: {} {}", self.binary.display(), args.join(" "));

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let output = command.output().await?;

        Ok(CapturedOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        })
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::engine_unavailable("FFmpeg not found in PATH"))
}
