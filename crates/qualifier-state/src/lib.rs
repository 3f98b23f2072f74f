//! Qualifier-State: scan repository for the study-eye qualifier
//!
//! This crate is the only place that talks to the imaging database. It hands
//! the eligibility pipeline typed records and keeps the legacy conventions
//! (CAL/TST tags in scan identifiers, eye codes) at the boundary.
//!
//! ## Key Components
//!
//! - `ScanRepository`: async read-only contract the pipeline consumes
//! - `SurrealScanRepository`: SurrealDB adapter with parameterized queries
//! - `MemoryScanRepository`: in-memory fake that journals every query

mod error;
pub mod fakes;
mod handle;
pub mod migrations;
pub mod schema;
pub mod storage_traits;
pub mod surreal_repository;

pub use error::StorageError;
pub use handle::{connect, RepositoryConfig};
pub use schema::{EnrollmentRow, ScanAnalysisRow, ScanRow};
pub use storage_traits::{
    AnalysisProcess, CalibrationRecord, Eye, EyeIdentity, ScanEligibility, ScanKind, ScanRecord,
    ScanRepository, StorageResult,
};
pub use surreal_repository::SurrealScanRepository;
