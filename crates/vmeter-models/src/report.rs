//! Per-preset loudness report.
//!
//! Turns a [`LoudnessMeasurement`] and a [`LoudnessTarget`] into the values a
//! client renders: one-decimal readings, pass/fail flags, the direction of any
//! miss, and meter positions on a -30..0 LUFS scale.

use serde::{Deserialize, Serialize};

use crate::loudness::{is_within_target, LoudnessMeasurement, LoudnessTarget};
use crate::preset::{Preset, PresetId};

/// Lowest value shown on the meter scale.
pub const METER_FLOOR_LUFS: f64 = -30.0;

/// Highest value shown on the meter scale.
pub const METER_CEILING_LUFS: f64 = 0.0;

/// Display text for an absent reading.
const NOT_AVAILABLE: &str = "N/A";

/// Outcome of comparing one reading against a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetVerdict {
    /// Reading is inside the window
    Within,
    /// Reading is louder than the window allows
    Above { by: f64 },
    /// Reading is quieter than the window allows
    Below { by: f64 },
    /// No reading to compare
    Unmeasured,
}

impl TargetVerdict {
    pub fn evaluate(measured: Option<f64>, target: &LoudnessTarget) -> Self {
        let Some(value) = measured else {
            return TargetVerdict::Unmeasured;
        };
        if is_within_target(measured, target) {
            return TargetVerdict::Within;
        }
        let deviation = target.deviation(value);
        if deviation > 0.0 {
            TargetVerdict::Above { by: deviation.abs() }
        } else {
            TargetVerdict::Below { by: deviation.abs() }
        }
    }

    pub fn is_within(&self) -> bool {
        matches!(self, TargetVerdict::Within)
    }
}

/// Report for a single reading (integrated or short-term).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelReport {
    pub value: Option<f64>,
    pub display: String,
    pub within_target: bool,
    pub verdict: TargetVerdict,
    /// Position on the meter in percent (0..=100)
    pub meter_position: f64,
}

impl ChannelReport {
    fn new(value: Option<f64>, target: &LoudnessTarget) -> Self {
        Self {
            value,
            display: format_lufs(value),
            within_target: is_within_target(value, target),
            verdict: TargetVerdict::evaluate(value, target),
            meter_position: meter_position(value),
        }
    }
}

/// Measurement compared against a target or preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoudnessReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<PresetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_name: Option<String>,
    pub target: LoudnessTarget,
    pub target_position: f64,
    pub integrated: ChannelReport,
    pub short_term: ChannelReport,
    /// Human-readable note when the integrated reading misses the window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl LoudnessReport {
    /// Compare a measurement against a bare target.
    pub fn new(measurement: &LoudnessMeasurement, target: LoudnessTarget) -> Self {
        let integrated = ChannelReport::new(measurement.integrated(), &target);
        let short_term = ChannelReport::new(measurement.short_term(), &target);
        let summary = match integrated.verdict {
            TargetVerdict::Above { by } => {
                Some(format!("Integrated LUFS is {:.1} LUFS above target.", by))
            }
            TargetVerdict::Below { by } => {
                Some(format!("Integrated LUFS is {:.1} LUFS below target.", by))
            }
            TargetVerdict::Within | TargetVerdict::Unmeasured => None,
        };

        Self {
            preset_id: None,
            preset_name: None,
            target,
            target_position: meter_position(Some(target.target)),
            integrated,
            short_term,
            summary,
        }
    }

    /// Compare a measurement against a stored preset.
    pub fn for_preset(measurement: &LoudnessMeasurement, preset: &Preset) -> Self {
        Self {
            preset_id: Some(preset.id),
            preset_name: Some(preset.name.clone()),
            ..Self::new(measurement, preset.loudness_target())
        }
    }

    /// True when both readings are present and inside the window.
    pub fn all_within(&self) -> bool {
        self.integrated.within_target && self.short_term.within_target
    }
}

/// Format a reading with one decimal place, or `N/A` when absent.
pub fn format_lufs(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Map a reading onto the meter scale in percent. Absent maps to 0.
pub fn meter_position(value: Option<f64>) -> f64 {
    let Some(v) = value else {
        return 0.0;
    };
    let clamped = v.clamp(METER_FLOOR_LUFS, METER_CEILING_LUFS);
    (clamped - METER_FLOOR_LUFS) / (METER_CEILING_LUFS - METER_FLOOR_LUFS) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broadcast() -> LoudnessTarget {
        LoudnessTarget::new(-23.0, 1.0).unwrap()
    }

    #[test]
    fn test_verdict_directions() {
        let t = broadcast();
        assert_eq!(TargetVerdict::evaluate(Some(-23.4), &t), TargetVerdict::Within);
        assert_eq!(TargetVerdict::evaluate(None, &t), TargetVerdict::Unmeasured);

        match TargetVerdict::evaluate(Some(-20.0), &t) {
            TargetVerdict::Above { by } => assert!((by - 3.0).abs() < 1e-9),
            other => panic!("expected Above, got {:?}", other),
        }
        match TargetVerdict::evaluate(Some(-26.5), &t) {
            TargetVerdict::Below { by } => assert!((by - 3.5).abs() < 1e-9),
            other => panic!("expected Below, got {:?}", other),
        }
    }

    #[test]
    fn test_format_lufs() {
        assert_eq!(format_lufs(Some(-23.44)), "-23.4");
        assert_eq!(format_lufs(Some(-9.0)), "-9.0");
        assert_eq!(format_lufs(None), "N/A");
    }

    #[test]
    fn test_meter_position_clamps() {
        assert_eq!(meter_position(None), 0.0);
        assert_eq!(meter_position(Some(-45.0)), 0.0);
        assert_eq!(meter_position(Some(3.0)), 100.0);
        assert!((meter_position(Some(-15.0)) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_does_not_treat_absent_as_zero() {
        // A 0 LUFS reading would be far outside a -23 target; an absent one
        // must show as unmeasured instead.
        let m = LoudnessMeasurement::new(Some(-23.2), None, "");
        let report = LoudnessReport::new(&m, broadcast());

        assert!(report.integrated.within_target);
        assert_eq!(report.short_term.display, "N/A");
        assert_eq!(report.short_term.verdict, TargetVerdict::Unmeasured);
        assert!(!report.short_term.within_target);
        assert!(!report.all_within());
        assert!(report.summary.is_none());
    }

    #[test]
    fn test_report_summary_when_integrated_misses() {
        let m = LoudnessMeasurement::new(Some(-25.5), Some(-24.0), "");
        let report = LoudnessReport::new(&m, LoudnessTarget::new(-23.0, 2.0).unwrap());
        assert_eq!(
            report.summary.as_deref(),
            Some("Integrated LUFS is 2.5 LUFS below target.")
        );
        assert!(report.short_term.within_target);
    }

    #[test]
    fn test_verdict_json_is_tagged() {
        let json = serde_json::to_value(TargetVerdict::Above { by: 1.5 }).unwrap();
        assert_eq!(json["status"], "above");
        assert_eq!(json["by"], 1.5);
    }
}
