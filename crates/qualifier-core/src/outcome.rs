//! The terminal result of a qualifier run.

use qualifier_state::{Eye, EyeIdentity, ScanEligibility};
use serde::{Deserialize, Serialize};

/// Final classification of the eye. Discriminants are the result ids written
/// to the outcome file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    MissingData = 0,
    Qualified = 2,
    Disqualified = 3,
    ScreenFailure = 4,
    NotStudyEye = 5,
}

impl ResultCode {
    pub fn id(self) -> i32 {
        self as i32
    }
}

/// Exactly one per run, produced by the gate that terminates the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityOutcome {
    pub patient_id: i64,
    pub eye: Eye,
    pub result: ResultCode,
    pub message: String,
}

impl EligibilityOutcome {
    pub fn new(identity: &EyeIdentity, result: ResultCode, message: impl Into<String>) -> Self {
        Self {
            patient_id: identity.patient_id,
            eye: identity.eye,
            result,
            message: message.into(),
        }
    }
}

/// One evaluated raster scan, as written to the scan-data report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDataRow {
    pub scan_id: i64,
    pub vg_process_id: i64,
    pub dn_process_id: i64,
    pub study_eye: bool,
}

impl From<&ScanEligibility> for ScanDataRow {
    fn from(record: &ScanEligibility) -> Self {
        Self {
            scan_id: record.scan_id,
            vg_process_id: record.process.vg_process_id,
            dn_process_id: record.process.dn_process_id,
            study_eye: record.study_eye,
        }
    }
}
