//! Run lifecycle events.
//!
//! [`run_span`] tags everything logged during a run with the run id and
//! the eye under evaluation. The `emit_*` functions log the start, each
//! gate decision and the end of a run at `info` level.

use qualifier_state::EyeIdentity;
use tracing::info;

use crate::gates::GateKind;
use crate::outcome::EligibilityOutcome;

/// Span carrying the run id and eye. Attach to futures with
/// `tracing::Instrument`.
pub fn run_span(run_id: &str, identity: &EyeIdentity) -> tracing::Span {
    tracing::info_span!(
        "qualifier.run",
        run_id = %run_id,
        patient_id = identity.patient_id,
        eye = %identity.eye,
    )
}

pub fn emit_run_started(run_id: &str, identity: &EyeIdentity) {
    info!(
        event = "run.started",
        run_id = %run_id,
        patient_id = identity.patient_id,
        eye = %identity.eye,
    );
}

/// `passed` is false when the gate ended the run.
pub fn emit_gate_evaluated(run_id: &str, gate: GateKind, passed: bool) {
    info!(
        event = "gate.evaluated",
        run_id = %run_id,
        gate = gate.as_str(),
        passed = passed,
    );
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, outcome: &EligibilityOutcome) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        result_id = outcome.result.id(),
        message = %outcome.message,
    );
}

pub fn emit_run_failed(run_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "run.failed", run_id = %run_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use qualifier_state::Eye;

    #[test]
    fn test_run_span_enter() {
        let span = run_span("run-1", &EyeIdentity::new(1, Eye::Left));
        let _entered = span.enter();
    }
}
