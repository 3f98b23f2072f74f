//! Storage trait definitions for the qualifier
//!
//! `ScanRepository` is the read-only view of the imaging database that the
//! eligibility pipeline consumes. Everything it returns is already typed:
//! scan kinds are classified here, at the adapter boundary, so the gates
//! never look at raw identifiers.
//!
//! The trait is async and backend-agnostic. An in-memory fake lives in the
//! `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Eye identity
// ---------------------------------------------------------------------------

/// Which eye of the patient is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eye {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl Eye {
    /// Single-character code used by the imaging database and result files.
    pub fn as_char(self) -> char {
        match self {
            Eye::Left => 'L',
            Eye::Right => 'R',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Eye::Left => "L",
            Eye::Right => "R",
        }
    }
}

impl FromStr for Eye {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L" | "l" => Ok(Eye::Left),
            "R" | "r" => Ok(Eye::Right),
            other => Err(StorageError::InvalidValue {
                field: "eye",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Eye {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The `(patient, eye)` pair a run evaluates. Supplied once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EyeIdentity {
    pub patient_id: i64,
    pub eye: Eye,
}

impl EyeIdentity {
    pub fn new(patient_id: i64, eye: Eye) -> Self {
        Self { patient_id, eye }
    }
}

impl std::fmt::Display for EyeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.patient_id, self.eye)
    }
}

// ---------------------------------------------------------------------------
// Scan records
// ---------------------------------------------------------------------------

/// One calibration attempt. Only its termination status matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub unique_id: String,
    pub termination_status: i64,
}

/// Acquisition kind, derived from the tag embedded in a scan's unique id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    Calibration,
    Raster,
    Other,
}

impl ScanKind {
    const CALIBRATION_TAG: &'static str = "CAL";
    const RASTER_TAG: &'static str = "TST";

    /// Classify a legacy unique identifier.
    ///
    /// `CAL` anywhere in the identifier marks a calibration scan, `TST` a
    /// raster scan. Calibration wins if both tags appear.
    pub fn classify(unique_id: &str) -> Self {
        if unique_id.contains(Self::CALIBRATION_TAG) {
            ScanKind::Calibration
        } else if unique_id.contains(Self::RASTER_TAG) {
            ScanKind::Raster
        } else {
            ScanKind::Other
        }
    }
}

/// A scan acquired for the eye, of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub unique_id: String,
    pub scan_id: i64,
    pub end_time: DateTime<Utc>,
    pub kind: ScanKind,
}

impl ScanRecord {
    /// Build a record from a raw identifier, classifying its kind.
    pub fn from_raw(unique_id: impl Into<String>, scan_id: i64, end_time: DateTime<Utc>) -> Self {
        let unique_id = unique_id.into();
        let kind = ScanKind::classify(&unique_id);
        Self {
            unique_id,
            scan_id,
            end_time,
            kind,
        }
    }
}

/// Analysis process identifiers attached to a scan's latest analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisProcess {
    /// Segmentation (VG) analysis unit process id.
    pub vg_process_id: i64,
    /// Quantification (DN) analysis unit process id.
    pub dn_process_id: i64,
    pub run_mode_type_id: i64,
}

/// Outcome of the most recent analysis run for one raster scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEligibility {
    pub scan_id: i64,
    pub update_longi_positions: bool,
    pub eligible_quant: bool,
    pub study_eye: bool,
    pub process: AnalysisProcess,
}

impl ScanEligibility {
    /// A scan is eligible when analysis both updated the longitudinal
    /// positions and marked it eligible for quantification.
    pub fn is_eligible(&self) -> bool {
        self.update_longi_positions && self.eligible_quant
    }
}

// ---------------------------------------------------------------------------
// ScanRepository
// ---------------------------------------------------------------------------

/// Read-only source of scan, calibration and enrollment data.
///
/// Guarantees:
/// - `scan_records` is ordered by `end_time` ascending.
/// - `scan_eligibility` returns the most recent analysis run for the scan.
/// - Implementations never build queries by interpolating inputs.
#[async_trait]
pub trait ScanRepository: Send + Sync {
    /// Calibration attempts recorded for the eye.
    async fn calibration_records(&self, eye: &EyeIdentity)
        -> StorageResult<Vec<CalibrationRecord>>;

    /// All scans for the eye, any kind, oldest first.
    async fn scan_records(&self, eye: &EyeIdentity) -> StorageResult<Vec<ScanRecord>>;

    /// Enrollment inclusion flag. `None` when the eye has no enrollment row.
    async fn enrollment_flag(&self, eye: &EyeIdentity) -> StorageResult<Option<bool>>;

    /// Latest analysis eligibility for a scan. `None` when no analysis exists.
    async fn scan_eligibility(&self, scan_id: i64) -> StorageResult<Option<ScanEligibility>>;
}
