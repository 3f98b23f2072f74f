//! Calibration gate: too many failed calibrations is a screen failure.

use qualifier_state::{CalibrationRecord, EyeIdentity};

use super::GateDecision;
use crate::audit::AuditLog;
use crate::config::Thresholds;
use crate::outcome::{EligibilityOutcome, ResultCode};

pub struct CalibrationGate;

impl CalibrationGate {
    /// Count failed calibrations. Passes the count on for the scan-count
    /// cross-check.
    pub fn evaluate(
        identity: &EyeIdentity,
        records: &[CalibrationRecord],
        thresholds: &Thresholds,
        log: &mut AuditLog,
    ) -> GateDecision<usize> {
        let failed = records
            .iter()
            .filter(|r| r.termination_status != thresholds.calibration_success_status)
            .count();

        if failed >= thresholds.failed_calibration_threshold {
            let message = format!(
                "Screen failure - {} failed calibrations",
                thresholds.failed_calibration_threshold
            );
            log.gate_failed(message.as_str());
            log.aborted();
            return GateDecision::Terminal(EligibilityOutcome::new(
                identity,
                ResultCode::ScreenFailure,
                message,
            ));
        }

        log.gate_succeeded("Success in calibration check");
        GateDecision::Pass(failed)
    }
}
