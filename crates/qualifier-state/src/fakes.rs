//! In-memory fakes for storage traits (testing only)
//!
//! `MemoryScanRepository` satisfies the [`ScanRepository`] contract without a
//! database and journals every query it answers, so callers can assert which
//! lookups a run did (or did not) issue.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::storage_traits::*;

/// A query answered by [`MemoryScanRepository`], in the order received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryQuery {
    CalibrationRecords(EyeIdentity),
    ScanRecords(EyeIdentity),
    EnrollmentFlag(EyeIdentity),
    ScanEligibility(i64),
}

#[derive(Debug, Default)]
struct EyeData {
    enrollment: Option<bool>,
    calibrations: Vec<CalibrationRecord>,
    scans: Vec<ScanRecord>,
}

/// In-memory scan repository keyed by `(patient, eye)`.
#[derive(Debug, Default)]
pub struct MemoryScanRepository {
    eyes: HashMap<EyeIdentity, EyeData>,
    /// All analysis runs per scan; the one with the highest VG process id wins.
    analyses: HashMap<i64, Vec<ScanEligibility>>,
    failing: Vec<RepositoryQuery>,
    journal: Mutex<Vec<RepositoryQuery>>,
}

impl MemoryScanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the enrollment inclusion flag for an eye.
    pub fn with_enrollment(mut self, eye: EyeIdentity, included: bool) -> Self {
        self.eyes.entry(eye).or_default().enrollment = Some(included);
        self
    }

    /// Add a calibration attempt with the given termination status.
    pub fn with_calibration(
        mut self,
        eye: EyeIdentity,
        unique_id: impl Into<String>,
        termination_status: i64,
    ) -> Self {
        self.eyes
            .entry(eye)
            .or_default()
            .calibrations
            .push(CalibrationRecord {
                unique_id: unique_id.into(),
                termination_status,
            });
        self
    }

    /// Add a scan; its kind is classified from `unique_id`.
    pub fn with_scan(
        mut self,
        eye: EyeIdentity,
        unique_id: impl Into<String>,
        scan_id: i64,
        end_time: DateTime<Utc>,
    ) -> Self {
        self.eyes
            .entry(eye)
            .or_default()
            .scans
            .push(ScanRecord::from_raw(unique_id, scan_id, end_time));
        self
    }

    /// Add one analysis run for a scan.
    pub fn with_eligibility(mut self, record: ScanEligibility) -> Self {
        self.analyses.entry(record.scan_id).or_default().push(record);
        self
    }

    /// Make the given query fail with a backend error.
    pub fn with_backend_error(mut self, query: RepositoryQuery) -> Self {
        self.failing.push(query);
        self
    }

    /// Queries answered so far, oldest first.
    pub fn journal(&self) -> Vec<RepositoryQuery> {
        self.journal.lock().unwrap().clone()
    }

    /// Scan ids whose eligibility was looked up, in lookup order.
    pub fn eligibility_lookups(&self) -> Vec<i64> {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter_map(|q| match q {
                RepositoryQuery::ScanEligibility(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn answer(&self, query: RepositoryQuery) -> StorageResult<()> {
        let failing = self.failing.contains(&query);
        self.journal.lock().unwrap().push(query.clone());
        if failing {
            return Err(StorageError::Backend(format!(
                "injected failure for {:?}",
                query
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ScanRepository for MemoryScanRepository {
    async fn calibration_records(
        &self,
        eye: &EyeIdentity,
    ) -> StorageResult<Vec<CalibrationRecord>> {
        self.answer(RepositoryQuery::CalibrationRecords(*eye))?;
        Ok(self
            .eyes
            .get(eye)
            .map(|d| d.calibrations.clone())
            .unwrap_or_default())
    }

    async fn scan_records(&self, eye: &EyeIdentity) -> StorageResult<Vec<ScanRecord>> {
        self.answer(RepositoryQuery::ScanRecords(*eye))?;
        let mut scans = self
            .eyes
            .get(eye)
            .map(|d| d.scans.clone())
            .unwrap_or_default();
        scans.sort_by_key(|s| s.end_time);
        Ok(scans)
    }

    async fn enrollment_flag(&self, eye: &EyeIdentity) -> StorageResult<Option<bool>> {
        self.answer(RepositoryQuery::EnrollmentFlag(*eye))?;
        Ok(self.eyes.get(eye).and_then(|d| d.enrollment))
    }

    async fn scan_eligibility(&self, scan_id: i64) -> StorageResult<Option<ScanEligibility>> {
        self.answer(RepositoryQuery::ScanEligibility(scan_id))?;
        Ok(self.analyses.get(&scan_id).and_then(|runs| {
            runs.iter()
                .max_by_key(|r| r.process.vg_process_id)
                .copied()
        }))
    }
}
