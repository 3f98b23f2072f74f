//! Tracing output of a qualifier run.

use qualifier_core::{
    emit_gate_evaluated, emit_run_finished, emit_run_started, run_span, EligibilityOutcome,
    GateKind, MemoryLogSink, MemoryOutcomeRecorder, QualifierConfig, QualifierPipeline,
    ResultCode,
};
use qualifier_state::fakes::MemoryScanRepository;
use qualifier_state::{Eye, EyeIdentity};
use tracing_test::traced_test;

fn eye() -> EyeIdentity {
    EyeIdentity::new(812, Eye::Left)
}

#[traced_test]
#[test]
fn run_started_event_carries_patient() {
    emit_run_started("run-123", &eye());
    assert!(logs_contain("run.started"));
    assert!(logs_contain("patient_id=812"));
}

#[traced_test]
#[test]
fn gate_event_names_the_gate() {
    emit_gate_evaluated("run-123", GateKind::Calibration, true);
    assert!(logs_contain("gate.evaluated"));
    assert!(logs_contain("calibration"));
}

#[traced_test]
#[test]
fn run_finished_event_carries_result_id() {
    let outcome = EligibilityOutcome::new(&eye(), ResultCode::Disqualified, "done");
    emit_run_finished("run-123", 17, &outcome);
    assert!(logs_contain("run.finished"));
    assert!(logs_contain("result_id=3"));
}

#[traced_test]
#[test]
fn events_inside_run_span_carry_run_id() {
    let span = run_span("run-span-7", &eye());
    let _entered = span.enter();
    tracing::info!("inside span");
    assert!(logs_contain("inside span"));
    assert!(logs_contain("run-span-7"));
}

#[traced_test]
#[tokio::test]
async fn audit_entries_are_traced() {
    let repo = MemoryScanRepository::new();
    let mut log = MemoryLogSink::new();
    let mut recorder = MemoryOutcomeRecorder::new();
    let mut pipeline =
        QualifierPipeline::new(QualifierConfig::default(), eye(), &mut log, &mut recorder);

    pipeline.run(&repo).await.unwrap();

    assert!(logs_contain("Abort qualifier"));
    assert!(logs_contain("audit.entry"));
}
