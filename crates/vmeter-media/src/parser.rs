//! Loudness log parsing.
//!
//! FFmpeg reports ebur128 readings only as diagnostic text. Parsing is kept
//! behind [`LoudnessLogParser`] so a change in that text format stays here.

use std::sync::OnceLock;

use regex::Regex;
use vmeter_models::LoudnessMeasurement;

/// Extracts loudness readings from engine diagnostic text.
pub trait LoudnessLogParser: Send + Sync {
    /// Parse a log. Missing or malformed markers yield absent readings.
    fn parse(&self, log: &str) -> LoudnessMeasurement;
}

/// Parser for the `I: <n> LUFS` / `S: <n> LUFS` markers emitted by ebur128.
///
/// When a marker appears more than once the first occurrence wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct EbuR128LogParser;

static INTEGRATED_RE: OnceLock<Regex> = OnceLock::new();
static SHORT_TERM_RE: OnceLock<Regex> = OnceLock::new();

fn marker_regex(marker: &str) -> Regex {
    let pattern = format!(r"{}:\s*([+-]?\d+(?:\.\d+)?)\s*LUFS", regex::escape(marker));
    Regex::new(&pattern).expect("loudness marker pattern is valid")
}

fn integrated_re() -> &'static Regex {
    INTEGRATED_RE.get_or_init(|| marker_regex("I"))
}

fn short_term_re() -> &'static Regex {
    SHORT_TERM_RE.get_or_init(|| marker_regex("S"))
}

fn first_reading(re: &Regex, log: &str) -> Option<f64> {
    re.captures(log)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

impl LoudnessLogParser for EbuR128LogParser {
    fn parse(&self, log: &str) -> LoudnessMeasurement {
        LoudnessMeasurement::new(
            first_reading(integrated_re(), log),
            first_reading(short_term_re(), log),
            log,
        )
    }
}
