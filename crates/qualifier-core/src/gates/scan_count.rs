//! Scan-count gate: enough raster scans, and a calibration history that
//! makes them usable.
//!
//! The gate sorts its own input by end time, so the sample it passes on is
//! always the chronologically earliest raster scans whatever order the
//! repository returned them in.

use qualifier_state::{EyeIdentity, ScanKind, ScanRecord};

use super::GateDecision;
use crate::audit::AuditLog;
use crate::config::{CalibrationPolicy, Thresholds};
use crate::outcome::{EligibilityOutcome, ResultCode};

/// The raster scans the eligibility gate will examine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterSample {
    /// Earliest raster scans, oldest first. Never empty, never longer than
    /// `max_required_scans`.
    pub scans: Vec<ScanRecord>,
    /// Raster scans the eye has in total.
    pub available: usize,
}

impl RasterSample {
    pub fn size(&self) -> usize {
        self.scans.len()
    }

    pub fn scan_ids(&self) -> Vec<i64> {
        self.scans.iter().map(|s| s.scan_id).collect()
    }
}

pub struct ScanCountGate;

impl ScanCountGate {
    pub fn evaluate(
        identity: &EyeIdentity,
        scans: &[ScanRecord],
        failed_calibrations: usize,
        policy: CalibrationPolicy,
        thresholds: &Thresholds,
        log: &mut AuditLog,
    ) -> GateDecision<RasterSample> {
        let mut ordered: Vec<&ScanRecord> = scans.iter().collect();
        ordered.sort_by_key(|s| s.end_time);

        let calibration_scans = ordered
            .iter()
            .filter(|s| s.kind == ScanKind::Calibration)
            .count();
        let raster_scans: Vec<ScanRecord> = ordered
            .into_iter()
            .filter(|s| s.kind == ScanKind::Raster)
            .cloned()
            .collect();

        let missing_calibration = match policy {
            CalibrationPolicy::RequireSuccessfulCalibration => {
                (calibration_scans < thresholds.failed_calibration_threshold
                    && failed_calibrations == calibration_scans)
                    .then_some("Missing data - this eye does not have a successful calibration scan")
            }
            CalibrationPolicy::RequireAnyCalibration => (calibration_scans < 1)
                .then_some("Missing data - this eye doesn't have calibration scans"),
        };
        if let Some(message) = missing_calibration {
            return Self::missing_data(identity, message.to_string(), log);
        }

        let available = raster_scans.len();
        if available < thresholds.required_scans {
            let message = format!(
                "Missing data - this eye has {} raster scans where {} is required",
                available, thresholds.required_scans
            );
            return Self::missing_data(identity, message, log);
        }

        log.gate_succeeded(format!(
            "This eye has {} raster scans where {} are required",
            available, thresholds.required_scans
        ));

        let sample_size = available
            .min(thresholds.max_required_scans)
            .max(thresholds.required_scans);
        let mut sample = raster_scans;
        sample.truncate(sample_size);

        GateDecision::Pass(RasterSample {
            scans: sample,
            available,
        })
    }

    fn missing_data(
        identity: &EyeIdentity,
        message: String,
        log: &mut AuditLog,
    ) -> GateDecision<RasterSample> {
        log.gate_failed(message.as_str());
        log.aborted();
        GateDecision::Terminal(EligibilityOutcome::new(
            identity,
            ResultCode::MissingData,
            message,
        ))
    }
}
