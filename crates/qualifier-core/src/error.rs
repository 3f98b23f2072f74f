//! Error taxonomy for a qualifier run.
//!
//! Only fatal conditions are errors. Missing data, a non-study eye, screen
//! failures and disqualification are ordinary outcomes and never show up
//! here.

use qualifier_state::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum QualifierError {
    /// The repository could not be opened; no gate ran.
    #[error("failed to connect to scan repository: {0}")]
    Connectivity(#[source] StorageError),

    /// A repository query failed after the connection was established.
    #[error("scan repository query failed: {0}")]
    Repository(#[from] StorageError),

    /// A raster scan has no analysis row, which means the repository and the
    /// pipeline disagree about the schema.
    #[error("scan {scan_id} has no analysis eligibility record")]
    MissingEligibility { scan_id: i64 },

    /// Writing the outcome, scan data or audit log failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type for qualifier operations.
pub type Result<T> = std::result::Result<T, QualifierError>;
