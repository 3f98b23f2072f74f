//! Run configuration: which optional gates run and the thresholds they use.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the scan-count gate cross-checks calibration scans before counting
/// raster scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPolicy {
    /// Missing data when fewer calibration scans than the failure threshold
    /// exist and every one of them failed.
    #[default]
    RequireSuccessfulCalibration,
    /// Missing data only when the eye has no calibration scan at all.
    RequireAnyCalibration,
}

impl CalibrationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            CalibrationPolicy::RequireSuccessfulCalibration => "successful",
            CalibrationPolicy::RequireAnyCalibration => "any",
        }
    }
}

impl FromStr for CalibrationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "successful" | "a" => Ok(CalibrationPolicy::RequireSuccessfulCalibration),
            "any" | "b" => Ok(CalibrationPolicy::RequireAnyCalibration),
            other => Err(format!(
                "unknown calibration policy '{}', expected 'successful' or 'any'",
                other
            )),
        }
    }
}

impl std::fmt::Display for CalibrationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric limits shared by the gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum raster scans before eligibility is evaluated.
    pub required_scans: usize,
    /// Raster scans examined at most; also the count that turns an all-failed
    /// sample into a disqualification.
    pub max_required_scans: usize,
    /// Failed calibrations that end the run as a screen failure.
    pub failed_calibration_threshold: usize,
    /// Termination status of a successful calibration.
    pub calibration_success_status: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            required_scans: 1,
            max_required_scans: 3,
            failed_calibration_threshold: 3,
            calibration_success_status: 4,
        }
    }
}

/// Configuration of one qualifier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QualifierConfig {
    /// Run the study-eye gate ("just study eye" mode).
    pub study_eye_gate: bool,
    pub calibration_policy: CalibrationPolicy,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl QualifierConfig {
    pub fn with_study_eye_gate(mut self, enabled: bool) -> Self {
        self.study_eye_gate = enabled;
        self
    }

    pub fn with_calibration_policy(mut self, policy: CalibrationPolicy) -> Self {
        self.calibration_policy = policy;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}
