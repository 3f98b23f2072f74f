//! Schema definitions for the qualifier's SurrealDB tables
//!
//! Tables:
//! - scan: every acquisition, calibration or raster, with its owner and end time
//! - eye_enrollment: study enrollment flag per (patient, eye)
//! - scan_analysis: one row per analysis run of a scan

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{
    AnalysisProcess, CalibrationRecord, Eye, ScanEligibility, ScanRecord,
};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Configuration type id of a calibration acquisition.
pub const CALIBRATION_CONFIGURATION_TYPE: i64 = 0;

/// Scan row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub scan_id: i64,
    /// Legacy identifier carrying the CAL/TST kind tag
    pub unique_identifier: String,
    pub patient_id: i64,
    /// "L" or "R"
    pub eye: String,
    pub configuration_type_id: i64,
    pub termination_status_type_id: i64,
    #[serde(with = "surreal_datetime")]
    pub end_time: DateTime<Utc>,
}

impl ScanRow {
    pub fn new(
        scan_id: i64,
        unique_identifier: impl Into<String>,
        patient_id: i64,
        eye: Eye,
        configuration_type_id: i64,
        termination_status_type_id: i64,
        end_time: DateTime<Utc>,
    ) -> Self {
        ScanRow {
            id: None,
            scan_id,
            unique_identifier: unique_identifier.into(),
            patient_id,
            eye: eye.as_str().to_string(),
            configuration_type_id,
            termination_status_type_id,
            end_time,
        }
    }
}

/// Projection used by the calibration query.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CalibrationRow {
    pub unique_identifier: String,
    pub termination_status_type_id: i64,
}

impl From<CalibrationRow> for CalibrationRecord {
    fn from(row: CalibrationRow) -> Self {
        CalibrationRecord {
            unique_id: row.unique_identifier,
            termination_status: row.termination_status_type_id,
        }
    }
}

/// Projection used by the scan listing query.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScanListingRow {
    pub unique_identifier: String,
    pub scan_id: i64,
    #[serde(with = "surreal_datetime")]
    pub end_time: DateTime<Utc>,
}

impl From<ScanListingRow> for ScanRecord {
    fn from(row: ScanListingRow) -> Self {
        ScanRecord::from_raw(row.unique_identifier, row.scan_id, row.end_time)
    }
}

/// Projection identifying which eye a scan belongs to.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScanOwnerRow {
    pub patient_id: i64,
    pub eye: String,
}

/// Enrollment row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub patient_id: i64,
    pub eye: String,
    pub is_included: bool,
}

impl EnrollmentRow {
    pub fn new(patient_id: i64, eye: Eye, is_included: bool) -> Self {
        EnrollmentRow {
            id: None,
            patient_id,
            eye: eye.as_str().to_string(),
            is_included,
        }
    }
}

/// Analysis run row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAnalysisRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub scan_id: i64,
    pub vg_process_id: i64,
    pub dn_process_id: i64,
    pub run_mode_type_id: i64,
    pub update_longi_positions: bool,
    pub eligible_quant: bool,
}

impl ScanAnalysisRow {
    pub fn new(
        scan_id: i64,
        process: AnalysisProcess,
        update_longi_positions: bool,
        eligible_quant: bool,
    ) -> Self {
        ScanAnalysisRow {
            id: None,
            scan_id,
            vg_process_id: process.vg_process_id,
            dn_process_id: process.dn_process_id,
            run_mode_type_id: process.run_mode_type_id,
            update_longi_positions,
            eligible_quant,
        }
    }

    /// Combine with the owning eye's enrollment flag.
    pub(crate) fn into_eligibility(self, study_eye: bool) -> ScanEligibility {
        ScanEligibility {
            scan_id: self.scan_id,
            update_longi_positions: self.update_longi_positions,
            eligible_quant: self.eligible_quant,
            study_eye,
            process: AnalysisProcess {
                vg_process_id: self.vg_process_id,
                dn_process_id: self.dn_process_id,
                run_mode_type_id: self.run_mode_type_id,
            },
        }
    }
}

/// Parse the stored eye column.
pub(crate) fn parse_eye(table: &'static str, raw: &str) -> Result<Eye, StorageError> {
    raw.parse().map_err(|_| StorageError::InvalidRow {
        table,
        reason: format!("unknown eye '{}'", raw),
    })
}
