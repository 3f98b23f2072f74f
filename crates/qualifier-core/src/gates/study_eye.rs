//! Study-eye gate: only enrolled study eyes are qualified.

use qualifier_state::EyeIdentity;

use super::GateDecision;
use crate::audit::AuditLog;
use crate::outcome::{EligibilityOutcome, ResultCode};

pub struct StudyEyeGate;

impl StudyEyeGate {
    /// Decide from the enrollment flag. An absent flag counts as not enrolled.
    pub fn evaluate(
        identity: &EyeIdentity,
        enrollment: Option<bool>,
        log: &mut AuditLog,
    ) -> GateDecision<()> {
        if enrollment == Some(true) {
            log.gate_succeeded("Success in study eye check");
            return GateDecision::Pass(());
        }

        let message = "Not study eye";
        log.gate_failed(message);
        log.aborted();
        GateDecision::Terminal(EligibilityOutcome::new(
            identity,
            ResultCode::NotStudyEye,
            message,
        ))
    }
}
