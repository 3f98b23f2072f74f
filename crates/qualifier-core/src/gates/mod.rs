//! Eligibility gates, in pipeline order.
//!
//! Each gate either passes a (possibly narrowed) value forward or ends the
//! run with an [`EligibilityOutcome`]. Gates write their own audit entries
//! but hold no state between calls.

pub mod calibration;
pub mod scan_count;
pub mod scan_eligibility;
pub mod study_eye;

use crate::outcome::EligibilityOutcome;

pub use calibration::CalibrationGate;
pub use scan_count::{RasterSample, ScanCountGate};
pub use scan_eligibility::{EligibilityReview, ScanEligibilityGate};
pub use study_eye::StudyEyeGate;

/// What a gate hands back to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision<T> {
    /// Continue with the given value.
    Pass(T),
    /// Stop; this is the run's outcome.
    Terminal(EligibilityOutcome),
}

impl<T> GateDecision<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GateDecision::Terminal(_))
    }

    /// The terminal outcome, if any.
    pub fn outcome(&self) -> Option<&EligibilityOutcome> {
        match self {
            GateDecision::Pass(_) => None,
            GateDecision::Terminal(outcome) => Some(outcome),
        }
    }
}

/// Gate identifiers, used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    StudyEye,
    Calibration,
    ScanCount,
    ScanEligibility,
}

impl GateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GateKind::StudyEye => "study_eye",
            GateKind::Calibration => "calibration",
            GateKind::ScanCount => "scan_count",
            GateKind::ScanEligibility => "scan_eligibility",
        }
    }
}
