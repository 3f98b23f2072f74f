//! End-to-end qualifier runs against the in-memory repository.
//!
//! The fake journals every query, which lets these tests assert not only
//! the outcome but also which lookups a run never made.

use chrono::{DateTime, Duration, TimeZone, Utc};
use qualifier_core::{
    ActionType, CalibrationPolicy, EligibilityOutcome, MemoryLogSink, MemoryOutcomeRecorder,
    OperationId, OutcomeRecorder, QualifierConfig, QualifierError, QualifierPipeline,
    QualifierReport, ResultCode, ScanDataRow, StatusType,
};
use qualifier_state::fakes::{MemoryScanRepository, RepositoryQuery};
use qualifier_state::{AnalysisProcess, Eye, EyeIdentity, ScanEligibility};

fn eye() -> EyeIdentity {
    EyeIdentity::new(5237, Eye::Right)
}

fn at(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 26, 8, 0, 0).unwrap() + Duration::hours(hours)
}

fn analysis(scan_id: i64, eligible: bool) -> ScanEligibility {
    ScanEligibility {
        scan_id,
        update_longi_positions: eligible,
        eligible_quant: eligible,
        study_eye: true,
        process: AnalysisProcess {
            vg_process_id: 900 + scan_id,
            dn_process_id: 950 + scan_id,
            run_mode_type_id: 1,
        },
    }
}

/// An eye with one successful calibration and the given raster scans, one
/// hour apart, each with an analysis row.
fn calibrated_eye(rasters: &[(i64, bool)]) -> MemoryScanRepository {
    let mut repo = MemoryScanRepository::new()
        .with_enrollment(eye(), true)
        .with_calibration(eye(), "R-CAL-1", 4)
        .with_scan(eye(), "R-CAL-1", 1, at(0));
    for (i, (scan_id, eligible)) in rasters.iter().enumerate() {
        repo = repo
            .with_scan(eye(), format!("R-TST-{}", scan_id), *scan_id, at(i as i64 + 1))
            .with_eligibility(analysis(*scan_id, *eligible));
    }
    repo
}

struct Run {
    result: Result<QualifierReport, QualifierError>,
    log: MemoryLogSink,
    recorder: MemoryOutcomeRecorder,
}

async fn run(config: QualifierConfig, repo: &MemoryScanRepository) -> Run {
    let mut log = MemoryLogSink::new();
    let mut recorder = MemoryOutcomeRecorder::new();
    let result = {
        let mut pipeline = QualifierPipeline::new(config, eye(), &mut log, &mut recorder);
        pipeline.start().unwrap();
        pipeline.run(repo).await
    };
    Run {
        result,
        log,
        recorder,
    }
}

#[tokio::test]
async fn no_raster_scans_is_missing_data() {
    let repo = calibrated_eye(&[]);
    let run = run(QualifierConfig::default(), &repo).await;

    let report = run.result.unwrap();
    assert_eq!(report.outcome.result, ResultCode::MissingData);
    assert_eq!(
        report.outcome.message,
        "Missing data - this eye has 0 raster scans where 1 is required"
    );
    assert!(repo.eligibility_lookups().is_empty());
    assert_eq!(run.recorder.outcomes, vec![report.outcome]);
}

#[tokio::test]
async fn first_scan_eligible_qualifies_without_further_lookups() {
    let repo = calibrated_eye(&[(11, true), (12, true), (13, false)]);
    let run = run(QualifierConfig::default(), &repo).await;

    let report = run.result.unwrap();
    assert_eq!(report.outcome.result, ResultCode::Qualified);
    assert_eq!(
        report.outcome.message,
        "Scan 11 is eligible. Eye is qualified for monitoring"
    );
    assert_eq!(repo.eligibility_lookups(), vec![11]);

    let scan_data = run.recorder.scan_data.unwrap();
    assert_eq!(scan_data.len(), 1);
    assert_eq!(scan_data[0].scan_id, 11);
    assert_eq!(scan_data[0].vg_process_id, 911);
    assert_eq!(scan_data[0].dn_process_id, 961);
}

#[tokio::test]
async fn later_eligible_scan_stops_at_that_scan() {
    let repo = calibrated_eye(&[(11, false), (12, true), (13, true)]);
    let run = run(QualifierConfig::default(), &repo).await;

    let report = run.result.unwrap();
    assert_eq!(report.outcome.result, ResultCode::Qualified);
    assert_eq!(repo.eligibility_lookups(), vec![11, 12]);
    assert_eq!(report.evaluated_scans.len(), 2);
}

#[tokio::test]
async fn three_ineligible_scans_disqualify() {
    let repo = calibrated_eye(&[(11, false), (12, false), (13, false), (14, true)]);
    let run = run(QualifierConfig::default(), &repo).await;

    let report = run.result.unwrap();
    assert_eq!(report.outcome.result, ResultCode::Disqualified);
    assert_eq!(report.outcome.message, "Eye is disqualified for monitoring");
    assert_eq!(repo.eligibility_lookups(), vec![11, 12, 13]);
    assert!(run
        .log
        .details()
        .contains(&"All 3 raster scans failed - eye is disqualified"));
}

#[tokio::test]
async fn two_ineligible_scans_wait_for_more() {
    let repo = calibrated_eye(&[(11, false), (12, false)]);
    let run = run(QualifierConfig::default(), &repo).await;

    let report = run.result.unwrap();
    assert_eq!(report.outcome.result, ResultCode::MissingData);
    assert_eq!(
        report.outcome.message,
        "All 2 raster scans failed - waiting for more scans..."
    );
}

#[tokio::test]
async fn one_ineligible_scan_waits_for_more() {
    let repo = calibrated_eye(&[(11, false)]);
    let run = run(QualifierConfig::default(), &repo).await;

    let report = run.result.unwrap();
    assert_eq!(report.outcome.result, ResultCode::MissingData);
    assert!(report.outcome.message.contains("waiting for more scans"));
}

#[tokio::test]
async fn failed_calibrations_end_run_before_scan_queries() {
    let repo = MemoryScanRepository::new()
        .with_calibration(eye(), "R-CAL-1", 0)
        .with_calibration(eye(), "R-CAL-2", 2)
        .with_calibration(eye(), "R-CAL-3", 0)
        .with_scan(eye(), "R-TST-11", 11, at(1))
        .with_eligibility(analysis(11, true));
    let run = run(QualifierConfig::default(), &repo).await;

    let report = run.result.unwrap();
    assert_eq!(report.outcome.result, ResultCode::ScreenFailure);
    assert_eq!(
        report.outcome.message,
        "Screen failure - 3 failed calibrations"
    );
    assert_eq!(
        repo.journal(),
        vec![RepositoryQuery::CalibrationRecords(eye())]
    );
    assert!(run.recorder.scan_data.is_none());
}

#[tokio::test]
async fn excluded_study_eye_ends_run_before_calibration_query() {
    let repo = calibrated_eye(&[(11, true)]);
    let repo = repo.with_enrollment(eye(), false);
    let config = QualifierConfig::default().with_study_eye_gate(true);
    let run = run(config, &repo).await;

    let report = run.result.unwrap();
    assert_eq!(report.outcome.result, ResultCode::NotStudyEye);
    assert_eq!(report.outcome.result.id(), 5);
    assert_eq!(repo.journal(), vec![RepositoryQuery::EnrollmentFlag(eye())]);
}

#[tokio::test]
async fn study_eye_gate_disabled_skips_enrollment_lookup() {
    let repo = calibrated_eye(&[(11, true)]).with_enrollment(eye(), false);
    let run = run(QualifierConfig::default(), &repo).await;

    assert_eq!(run.result.unwrap().outcome.result, ResultCode::Qualified);
    assert!(!repo.journal().contains(&RepositoryQuery::EnrollmentFlag(eye())));
}

#[tokio::test]
async fn enrolled_study_eye_continues_to_calibration() {
    let repo = calibrated_eye(&[(11, true)]);
    let config = QualifierConfig::default().with_study_eye_gate(true);
    let run = run(config, &repo).await;

    assert_eq!(run.result.unwrap().outcome.result, ResultCode::Qualified);
    assert_eq!(
        &repo.journal()[..2],
        &[
            RepositoryQuery::EnrollmentFlag(eye()),
            RepositoryQuery::CalibrationRecords(eye()),
        ]
    );
    assert_eq!(run.log.details()[1], "Success in study eye check");
}

#[tokio::test]
async fn calibration_policy_decides_failed_calibration_history() {
    // Two calibration scans, both failed: below the screen-failure threshold.
    let build = || {
        MemoryScanRepository::new()
            .with_calibration(eye(), "R-CAL-1", 0)
            .with_calibration(eye(), "R-CAL-2", 0)
            .with_scan(eye(), "R-CAL-1", 1, at(0))
            .with_scan(eye(), "R-CAL-2", 2, at(1))
            .with_scan(eye(), "R-TST-11", 11, at(2))
            .with_eligibility(analysis(11, true))
    };

    let strict = build();
    let run_a = run(QualifierConfig::default(), &strict).await;
    let report_a = run_a.result.unwrap();
    assert_eq!(report_a.outcome.result, ResultCode::MissingData);
    assert_eq!(
        report_a.outcome.message,
        "Missing data - this eye does not have a successful calibration scan"
    );

    let lenient = build();
    let config =
        QualifierConfig::default().with_calibration_policy(CalibrationPolicy::RequireAnyCalibration);
    let run_b = run(config, &lenient).await;
    assert_eq!(run_b.result.unwrap().outcome.result, ResultCode::Qualified);
}

#[tokio::test]
async fn any_calibration_policy_requires_a_calibration_scan() {
    let repo = MemoryScanRepository::new()
        .with_scan(eye(), "R-TST-11", 11, at(0))
        .with_eligibility(analysis(11, true));
    let config =
        QualifierConfig::default().with_calibration_policy(CalibrationPolicy::RequireAnyCalibration);
    let run = run(config, &repo).await;

    assert_eq!(
        run.result.unwrap().outcome.message,
        "Missing data - this eye doesn't have calibration scans"
    );
}

#[tokio::test]
async fn sample_takes_the_earliest_raster_scans() {
    // Inserted newest first; the repository orders them by end time.
    let repo = MemoryScanRepository::new()
        .with_calibration(eye(), "R-CAL-1", 4)
        .with_scan(eye(), "R-TST-15", 15, at(5))
        .with_scan(eye(), "R-TST-14", 14, at(4))
        .with_scan(eye(), "R-TST-13", 13, at(3))
        .with_scan(eye(), "R-TST-12", 12, at(2))
        .with_scan(eye(), "R-CAL-1", 1, at(0))
        .with_eligibility(analysis(12, false))
        .with_eligibility(analysis(13, false))
        .with_eligibility(analysis(14, false))
        .with_eligibility(analysis(15, true));
    let run = run(QualifierConfig::default(), &repo).await;

    assert_eq!(run.result.unwrap().outcome.result, ResultCode::Disqualified);
    assert_eq!(repo.eligibility_lookups(), vec![12, 13, 14]);
}

#[tokio::test]
async fn missing_analysis_row_fails_the_run() {
    let repo = MemoryScanRepository::new()
        .with_calibration(eye(), "R-CAL-1", 4)
        .with_scan(eye(), "R-CAL-1", 1, at(0))
        .with_scan(eye(), "R-TST-11", 11, at(1))
        .with_scan(eye(), "R-TST-12", 12, at(2))
        .with_eligibility(analysis(11, false));
    let run = run(QualifierConfig::default(), &repo).await;

    let err = run.result.unwrap_err();
    assert!(matches!(
        err,
        QualifierError::MissingEligibility { scan_id: 12 }
    ));
    assert!(run.recorder.outcomes.is_empty());
    assert_eq!(run.log.details().last(), Some(&"Qualifier failed"));
}

#[tokio::test]
async fn repository_error_fails_the_run() {
    let repo = calibrated_eye(&[(11, true)])
        .with_backend_error(RepositoryQuery::ScanRecords(eye()));
    let run = run(QualifierConfig::default(), &repo).await;

    assert!(matches!(
        run.result.unwrap_err(),
        QualifierError::Repository(_)
    ));
    let last_two: Vec<_> = run.log.entries[run.log.entries.len() - 2..]
        .iter()
        .map(|e| (e.operation_id, e.action_type, e.status_type))
        .collect();
    assert_eq!(
        last_two,
        vec![
            (OperationId::RUN_STATUS, ActionType::Error, StatusType::Failed),
            (OperationId::RUN_STATUS, ActionType::Error, StatusType::Failed),
        ]
    );
    assert!(run.recorder.outcomes.is_empty());
}

#[tokio::test]
async fn qualified_run_audit_trail_in_order() {
    let repo = calibrated_eye(&[(11, false), (12, true)]);
    let run = run(QualifierConfig::default(), &repo).await;
    run.result.unwrap();

    assert_eq!(
        run.log.details(),
        vec![
            "Qualifier started successfully",
            "Success in calibration check",
            "This eye has 2 raster scans where 1 are required",
            "Missing data - scan 11 is not eligible",
            "Scan 12 is eligible. Eye is qualified for monitoring",
            "Qualifier success",
        ]
    );
    let times: Vec<_> = run.log.entries.iter().map(|e| e.inserted_at).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn early_terminal_ends_with_abort_not_success() {
    let repo = calibrated_eye(&[]);
    let run = run(QualifierConfig::default(), &repo).await;
    run.result.unwrap();

    let last = run.log.entries.last().unwrap();
    assert_eq!(last.details, "Abort qualifier");
    assert_eq!(last.status_type, StatusType::Aborted);
    assert!(!run.log.details().contains(&"Qualifier success"));
}

#[tokio::test]
async fn exactly_one_outcome_per_run() {
    for rasters in [
        vec![],
        vec![(11, true)],
        vec![(11, false)],
        vec![(11, false), (12, false), (13, false)],
    ] {
        let repo = calibrated_eye(&rasters);
        let run = run(QualifierConfig::default(), &repo).await;
        run.result.unwrap();
        assert_eq!(run.recorder.outcomes.len(), 1);
    }
}

/// Accepts outcomes but cannot write the scan-data report.
#[derive(Default)]
struct ScanDataUnwritable {
    outcomes: Vec<EligibilityOutcome>,
}

impl OutcomeRecorder for ScanDataUnwritable {
    fn record_outcome(&mut self, outcome: &EligibilityOutcome) -> std::io::Result<()> {
        self.outcomes.push(outcome.clone());
        Ok(())
    }

    fn record_scan_data(&mut self, _rows: &[ScanDataRow]) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }
}

#[tokio::test]
async fn scan_data_write_failure_records_no_outcome() {
    let repo = calibrated_eye(&[(11, true)]);
    let mut log = MemoryLogSink::new();
    let mut recorder = ScanDataUnwritable::default();

    let result = {
        let mut pipeline =
            QualifierPipeline::new(QualifierConfig::default(), eye(), &mut log, &mut recorder);
        pipeline.run(&repo).await
    };

    assert!(matches!(result, Err(QualifierError::Output(_))));
    assert!(recorder.outcomes.is_empty());
    let details = log.details();
    assert_eq!(
        &details[details.len() - 2..],
        &["output error: disk full", "Qualifier failed"]
    );
    assert!(!details.contains(&"Qualifier success"));
}

#[tokio::test]
async fn early_terminal_does_not_touch_scan_data_report() {
    let repo = calibrated_eye(&[]);
    let mut log = MemoryLogSink::new();
    let mut recorder = ScanDataUnwritable::default();

    let result = {
        let mut pipeline =
            QualifierPipeline::new(QualifierConfig::default(), eye(), &mut log, &mut recorder);
        pipeline.run(&repo).await
    };

    assert_eq!(result.unwrap().outcome.result, ResultCode::MissingData);
    assert_eq!(recorder.outcomes.len(), 1);
}
