//! Loudness measurement and target window.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Loudness readings extracted from one analysis run.
///
/// Each reading is either a finite LUFS value or absent. Non-finite
/// values are dropped at construction so absence is the only way a
/// reading can be "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoudnessMeasurement {
    integrated: Option<f64>,
    short_term: Option<f64>,
    raw_log: String,
}

impl LoudnessMeasurement {
    /// Create a measurement, discarding non-finite readings.
    pub fn new(integrated: Option<f64>, short_term: Option<f64>, raw_log: impl Into<String>) -> Self {
        Self {
            integrated: integrated.filter(|v| v.is_finite()),
            short_term: short_term.filter(|v| v.is_finite()),
            raw_log: raw_log.into(),
        }
    }

    /// Integrated loudness in LUFS, if the engine reported one.
    pub fn integrated(&self) -> Option<f64> {
        self.integrated
    }

    /// Short-term loudness in LUFS, if the engine reported one.
    pub fn short_term(&self) -> Option<f64> {
        self.short_term
    }

    /// Full diagnostic text the readings were taken from.
    pub fn raw_log(&self) -> &str {
        &self.raw_log
    }

    /// True when neither reading was found.
    pub fn is_empty(&self) -> bool {
        self.integrated.is_none() && self.short_term.is_none()
    }
}

/// Target loudness with a symmetric tolerance window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessTarget {
    /// Target loudness in LUFS
    pub target: f64,
    /// Allowed deviation in dB
    pub tolerance: f64,
}

impl LoudnessTarget {
    /// Create a validated target. Tolerance must be finite and positive.
    pub fn new(target: f64, tolerance: f64) -> ModelResult<Self> {
        if !target.is_finite() {
            return Err(ModelError::InvalidTarget(format!("{} is not finite", target)));
        }
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(ModelError::InvalidTolerance(format!(
                "{} must be a positive number",
                tolerance
            )));
        }
        Ok(Self { target, tolerance })
    }

    /// Signed distance from the target (positive when louder).
    pub fn deviation(&self, measured: f64) -> f64 {
        measured - self.target
    }

    /// Inclusive window check on a known value.
    pub fn contains(&self, measured: f64) -> bool {
        self.deviation(measured).abs() <= self.tolerance
    }
}

/// Decide whether a measured value satisfies the target window.
///
/// An absent reading is never within target.
pub fn is_within_target(measured: Option<f64>, target: &LoudnessTarget) -> bool {
    match measured {
        Some(value) => target.contains(value),
        None => false,
    }
}
