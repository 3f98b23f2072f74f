//! Scan-eligibility gate.
//!
//! Walks the raster sample oldest first and stops at the first eligible
//! scan: one eligible scan qualifies the eye. If none is eligible, a full
//! sample disqualifies the eye and a short one defers the decision until
//! more scans arrive.

use qualifier_state::{EyeIdentity, ScanEligibility, ScanRepository};
use tracing::debug;

use super::scan_count::RasterSample;
use crate::audit::AuditLog;
use crate::config::Thresholds;
use crate::error::{QualifierError, Result};
use crate::outcome::{EligibilityOutcome, ResultCode};

/// Result of the eligibility walk. Always terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityReview {
    pub outcome: EligibilityOutcome,
    /// Analysis records fetched, in evaluation order. Scans after an
    /// eligible one are absent because they were never looked up.
    pub evaluated: Vec<ScanEligibility>,
}

pub struct ScanEligibilityGate;

impl ScanEligibilityGate {
    pub async fn evaluate(
        identity: &EyeIdentity,
        sample: &RasterSample,
        repo: &dyn ScanRepository,
        thresholds: &Thresholds,
        log: &mut AuditLog,
    ) -> Result<EligibilityReview> {
        let mut evaluated = Vec::with_capacity(sample.size());

        for scan in &sample.scans {
            let record = repo
                .scan_eligibility(scan.scan_id)
                .await?
                .ok_or(QualifierError::MissingEligibility {
                    scan_id: scan.scan_id,
                })?;
            debug!(
                scan_id = scan.scan_id,
                update_longi_positions = record.update_longi_positions,
                eligible_quant = record.eligible_quant,
                "scan analysis fetched"
            );
            evaluated.push(record);

            if record.is_eligible() {
                let message = format!(
                    "Scan {} is eligible. Eye is qualified for monitoring",
                    scan.scan_id
                );
                log.gate_succeeded(message.as_str());
                return Ok(EligibilityReview {
                    outcome: EligibilityOutcome::new(identity, ResultCode::Qualified, message),
                    evaluated,
                });
            }

            log.gate_failed(format!(
                "Missing data - scan {} is not eligible",
                scan.scan_id
            ));
        }

        let outcome = if sample.size() == thresholds.max_required_scans {
            log.gate_failed(format!(
                "All {} raster scans failed - eye is disqualified",
                thresholds.max_required_scans
            ));
            EligibilityOutcome::new(
                identity,
                ResultCode::Disqualified,
                "Eye is disqualified for monitoring",
            )
        } else {
            let message = format!(
                "All {} raster scans failed - waiting for more scans...",
                sample.size()
            );
            log.gate_failed(message.as_str());
            EligibilityOutcome::new(identity, ResultCode::MissingData, message)
        };

        Ok(EligibilityReview { outcome, evaluated })
    }
}
