//! SurrealDB-backed ScanRepository implementation
//!
//! Uses the row types in `schema` for persistence, converting to the typed
//! `storage_traits` records at the boundary. Every query binds its inputs as
//! parameters.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::debug;

use crate::handle::{self, RepositoryConfig};
use crate::schema::{
    parse_eye, CalibrationRow, EnrollmentRow, ScanAnalysisRow, ScanListingRow, ScanOwnerRow,
    ScanRow, CALIBRATION_CONFIGURATION_TYPE,
};
use crate::storage_traits::{
    CalibrationRecord, EyeIdentity, ScanEligibility, ScanRecord, ScanRepository, StorageResult,
};

/// SurrealDB-backed implementation of [`ScanRepository`].
#[derive(Clone)]
pub struct SurrealScanRepository {
    db: Surreal<Any>,
}

impl SurrealScanRepository {
    /// Connect using the given configuration.
    pub async fn connect(config: &RepositoryConfig) -> StorageResult<Self> {
        let db = handle::connect(config).await?;
        Ok(Self { db })
    }

    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect(&RepositoryConfig::in_memory()).await
    }

    // -- fixture loading -----------------------------------------------------

    /// Insert a scan row. Used to load fixtures; the pipeline never writes.
    pub async fn insert_scan(&self, row: ScanRow) -> StorageResult<()> {
        let _created: Option<ScanRow> = self.db.create("scan").content(row).await?;
        Ok(())
    }

    /// Insert an enrollment row.
    pub async fn insert_enrollment(&self, row: EnrollmentRow) -> StorageResult<()> {
        let _created: Option<EnrollmentRow> =
            self.db.create("eye_enrollment").content(row).await?;
        Ok(())
    }

    /// Insert an analysis run row.
    pub async fn insert_analysis(&self, row: ScanAnalysisRow) -> StorageResult<()> {
        let _created: Option<ScanAnalysisRow> =
            self.db.create("scan_analysis").content(row).await?;
        Ok(())
    }

    // -- private helpers -----------------------------------------------------

    async fn enrollment_for(&self, patient_id: i64, eye: String) -> StorageResult<Option<bool>> {
        let mut res = self
            .db
            .query(
                "SELECT VALUE is_included FROM eye_enrollment \
                 WHERE patient_id = $patient AND eye = $eye LIMIT 1",
            )
            .bind(("patient", patient_id))
            .bind(("eye", eye))
            .await?;

        let flags: Vec<bool> = res.take(0)?;
        Ok(flags.into_iter().next())
    }
}

#[async_trait]
impl ScanRepository for SurrealScanRepository {
    async fn calibration_records(
        &self,
        eye: &EyeIdentity,
    ) -> StorageResult<Vec<CalibrationRecord>> {
        debug!(eye = %eye, "querying calibration records");

        let mut res = self
            .db
            .query(
                "SELECT unique_identifier, termination_status_type_id FROM scan \
                 WHERE patient_id = $patient AND eye = $eye \
                 AND configuration_type_id = $calibration",
            )
            .bind(("patient", eye.patient_id))
            .bind(("eye", eye.eye.as_str().to_string()))
            .bind(("calibration", CALIBRATION_CONFIGURATION_TYPE))
            .await?;

        let rows: Vec<CalibrationRow> = res.take(0)?;
        Ok(rows.into_iter().map(CalibrationRecord::from).collect())
    }

    async fn scan_records(&self, eye: &EyeIdentity) -> StorageResult<Vec<ScanRecord>> {
        debug!(eye = %eye, "querying scan records");

        let mut res = self
            .db
            .query(
                "SELECT unique_identifier, scan_id, end_time FROM scan \
                 WHERE patient_id = $patient AND eye = $eye \
                 ORDER BY end_time ASC",
            )
            .bind(("patient", eye.patient_id))
            .bind(("eye", eye.eye.as_str().to_string()))
            .await?;

        let rows: Vec<ScanListingRow> = res.take(0)?;
        Ok(rows.into_iter().map(ScanRecord::from).collect())
    }

    async fn enrollment_flag(&self, eye: &EyeIdentity) -> StorageResult<Option<bool>> {
        debug!(eye = %eye, "querying enrollment flag");
        self.enrollment_for(eye.patient_id, eye.eye.as_str().to_string())
            .await
    }

    async fn scan_eligibility(&self, scan_id: i64) -> StorageResult<Option<ScanEligibility>> {
        debug!(scan_id, "querying latest scan analysis");

        let mut res = self
            .db
            .query(
                "SELECT * FROM scan_analysis WHERE scan_id = $scan \
                 ORDER BY vg_process_id DESC LIMIT 1",
            )
            .query("SELECT patient_id, eye FROM scan WHERE scan_id = $scan LIMIT 1")
            .bind(("scan", scan_id))
            .await?;

        let analyses: Vec<ScanAnalysisRow> = res.take(0)?;
        let owners: Vec<ScanOwnerRow> = res.take(1)?;

        let Some(analysis) = analyses.into_iter().next() else {
            return Ok(None);
        };

        // Study-eye flag comes from the owning eye's enrollment; an analysis
        // for an unknown scan counts as not enrolled.
        let study_eye = match owners.into_iter().next() {
            Some(owner) => {
                let eye = parse_eye("scan", &owner.eye)?;
                self.enrollment_for(owner.patient_id, eye.as_str().to_string())
                    .await?
                    .unwrap_or(false)
            }
            None => false,
        };

        Ok(Some(analysis.into_eligibility(study_eye)))
    }
}

