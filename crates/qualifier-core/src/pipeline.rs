//! The qualifier run: gates in order, one outcome, audit trail flushed as
//! it grows.
//!
//! ```text
//! start -> connect -> [study eye] -> calibration -> scan count -> eligibility
//! ```
//!
//! The first gate that returns a terminal decision ends the run. Repository
//! queries happen lazily, so a gate that ends the run prevents every query a
//! later gate would have made.

use std::future::Future;
use std::time::Instant;

use qualifier_state::{EyeIdentity, ScanRepository, StorageResult};
use serde::Serialize;
use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::audit::{ActionType, AuditLog, OperationId, StatusType};
use crate::config::QualifierConfig;
use crate::error::{QualifierError, Result};
use crate::gates::{
    CalibrationGate, GateDecision, GateKind, ScanCountGate, ScanEligibilityGate, StudyEyeGate,
};
use crate::obs;
use crate::outcome::{EligibilityOutcome, ScanDataRow};
use crate::sink::{LogSink, OutcomeRecorder};

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualifierReport {
    pub run_id: String,
    pub outcome: EligibilityOutcome,
    /// Scans the eligibility gate looked at; empty if an earlier gate ended
    /// the run.
    pub evaluated_scans: Vec<ScanDataRow>,
}

pub struct QualifierPipeline<'a> {
    config: QualifierConfig,
    identity: EyeIdentity,
    run_id: String,
    log: AuditLog,
    log_sink: &'a mut dyn LogSink,
    recorder: &'a mut dyn OutcomeRecorder,
}

impl<'a> QualifierPipeline<'a> {
    pub fn new(
        config: QualifierConfig,
        identity: EyeIdentity,
        log_sink: &'a mut dyn LogSink,
        recorder: &'a mut dyn OutcomeRecorder,
    ) -> Self {
        Self {
            config,
            identity,
            run_id: Uuid::new_v4().to_string(),
            log: AuditLog::new(),
            log_sink,
            recorder,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn identity(&self) -> &EyeIdentity {
        &self.identity
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.log
    }

    pub fn into_audit_log(self) -> AuditLog {
        self.log
    }

    /// Record that the run has started.
    pub fn start(&mut self) -> Result<()> {
        obs::emit_run_started(&self.run_id, &self.identity);
        self.log.record(
            OperationId::QUALIFIER,
            "Qualifier started successfully",
            ActionType::Diagnostic,
            StatusType::Succeeded,
        );
        self.flush()
    }

    /// Await the repository connection and record how it went.
    ///
    /// On failure the run is marked failed and no gate may run.
    pub async fn connect<R, F>(&mut self, connecting: F) -> Result<R>
    where
        F: Future<Output = StorageResult<R>>,
    {
        match connecting.await {
            Ok(repo) => {
                self.log.record(
                    OperationId::QUALIFIER,
                    "Connected to DB",
                    ActionType::Diagnostic,
                    StatusType::Succeeded,
                );
                self.flush()?;
                Ok(repo)
            }
            Err(err) => {
                let err = QualifierError::Connectivity(err);
                obs::emit_run_failed(&self.run_id, &err);
                self.log.run_failed("Failed to connect to DB");
                self.flush_or_warn();
                Err(err)
            }
        }
    }

    /// Run every gate against `repo` and record the outcome.
    ///
    /// Fatal errors are logged as a failed run before they are returned;
    /// no outcome is recorded for them.
    pub async fn run(&mut self, repo: &dyn ScanRepository) -> Result<QualifierReport> {
        let span = obs::run_span(&self.run_id, &self.identity);
        async {
            let started = Instant::now();
            match self.evaluate(repo).await {
                Ok(report) => {
                    obs::emit_run_finished(
                        &self.run_id,
                        started.elapsed().as_millis() as u64,
                        &report.outcome,
                    );
                    Ok(report)
                }
                Err(err) => {
                    obs::emit_run_failed(&self.run_id, &err);
                    self.log.run_failed(err.to_string());
                    self.flush_or_warn();
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn evaluate(&mut self, repo: &dyn ScanRepository) -> Result<QualifierReport> {
        let identity = self.identity;
        let thresholds = self.config.thresholds;

        if self.config.study_eye_gate {
            let enrollment = repo.enrollment_flag(&identity).await?;
            let decision = StudyEyeGate::evaluate(&identity, enrollment, &mut self.log);
            if let GateDecision::Terminal(outcome) =
                self.checkpoint(GateKind::StudyEye, decision)?
            {
                return self.finish(outcome, None);
            }
        }

        let calibrations = repo.calibration_records(&identity).await?;
        let decision =
            CalibrationGate::evaluate(&identity, &calibrations, &thresholds, &mut self.log);
        let failed_calibrations = match self.checkpoint(GateKind::Calibration, decision)? {
            GateDecision::Pass(failed) => failed,
            GateDecision::Terminal(outcome) => return self.finish(outcome, None),
        };

        let scans = repo.scan_records(&identity).await?;
        let decision = ScanCountGate::evaluate(
            &identity,
            &scans,
            failed_calibrations,
            self.config.calibration_policy,
            &thresholds,
            &mut self.log,
        );
        let sample = match self.checkpoint(GateKind::ScanCount, decision)? {
            GateDecision::Pass(sample) => sample,
            GateDecision::Terminal(outcome) => return self.finish(outcome, None),
        };

        let review =
            ScanEligibilityGate::evaluate(&identity, &sample, repo, &thresholds, &mut self.log)
                .await?;
        obs::emit_gate_evaluated(&self.run_id, GateKind::ScanEligibility, false);
        self.flush()?;

        let rows = review.evaluated.iter().map(ScanDataRow::from).collect();
        self.finish(review.outcome, Some(rows))
    }

    /// Trace and persist a gate's decision, then hand it back.
    fn checkpoint<T>(
        &mut self,
        gate: GateKind,
        decision: GateDecision<T>,
    ) -> Result<GateDecision<T>> {
        obs::emit_gate_evaluated(&self.run_id, gate, !decision.is_terminal());
        self.flush()?;
        Ok(decision)
    }

    /// Record the outcome. Scan data is present only when the eligibility
    /// gate ran, and only then is the run logged as a success.
    ///
    /// The outcome row is written last: it exists only if every other
    /// write of the run succeeded.
    fn finish(
        &mut self,
        outcome: EligibilityOutcome,
        scan_data: Option<Vec<ScanDataRow>>,
    ) -> Result<QualifierReport> {
        let completed = scan_data.is_some();
        let evaluated_scans = scan_data.unwrap_or_default();
        if completed {
            self.recorder.record_scan_data(&evaluated_scans)?;
        }
        self.flush()?;

        self.recorder.record_outcome(&outcome)?;
        if completed {
            self.log.run_succeeded();
        }
        // Outcome is recorded; the run no longer fails on the audit sink.
        self.flush_or_warn();

        Ok(QualifierReport {
            run_id: self.run_id.clone(),
            outcome,
            evaluated_scans,
        })
    }

    fn flush(&mut self) -> Result<()> {
        for entry in self.log.take_pending() {
            self.log_sink.append(entry)?;
        }
        Ok(())
    }

    /// Flush without failing the run; a sink error is only traced.
    fn flush_or_warn(&mut self) {
        if let Err(err) = self.flush() {
            warn!(run_id = %self.run_id, error = %err, "audit log flush failed");
        }
    }
}
