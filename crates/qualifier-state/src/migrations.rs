//! SurrealDB schema initialization
//!
//! Defines the tables the qualifier reads, with the indexes its lookups
//! rely on. Safe to call multiple times.

use crate::error::StorageError;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all qualifier tables
pub async fn init_schema(db: &Surreal<Any>) -> Result<(), StorageError> {
    info!("Initializing qualifier SurrealDB schema");

    init_scan_table(db).await?;
    init_enrollment_table(db).await?;
    init_scan_analysis_table(db).await?;

    info!("Qualifier schema initialization complete");
    Ok(())
}

/// Initialize `scan` table
///
/// Schema:
/// ```text
/// TABLE scan {
///   scan_id:                     INT (unique)
///   unique_identifier:           STRING (carries CAL / TST tag)
///   patient_id:                  INT
///   eye:                         STRING ("L" | "R")
///   configuration_type_id:       INT (0 = calibration)
///   termination_status_type_id:  INT (4 = success)
///   end_time:                    DATETIME
/// }
/// ```
async fn init_scan_table(db: &Surreal<Any>) -> Result<(), StorageError> {
    debug!("Initializing scan table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS scan SCHEMALESS
            PERMISSIONS
                FOR select FULL
                FOR create FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_scan_id ON TABLE scan COLUMNS scan_id UNIQUE;

        -- Per-eye listing ordered by acquisition end
        DEFINE INDEX IF NOT EXISTS idx_scan_eye_end ON TABLE scan COLUMNS patient_id, eye, end_time;
    "#;

    db.query(sql)
        .await
        .and_then(|r| r.check())
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    debug!("scan table initialized");
    Ok(())
}

/// Initialize `eye_enrollment` table
///
/// One row per `(patient_id, eye)`.
async fn init_enrollment_table(db: &Surreal<Any>) -> Result<(), StorageError> {
    debug!("Initializing eye_enrollment table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS eye_enrollment SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_enrollment_eye ON TABLE eye_enrollment COLUMNS patient_id, eye UNIQUE;
    "#;

    db.query(sql)
        .await
        .and_then(|r| r.check())
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    debug!("eye_enrollment table initialized");
    Ok(())
}

/// Initialize `scan_analysis` table
///
/// Several analysis runs may exist per scan; the latest has the highest
/// `vg_process_id`.
async fn init_scan_analysis_table(db: &Surreal<Any>) -> Result<(), StorageError> {
    debug!("Initializing scan_analysis table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS scan_analysis SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_analysis_scan ON TABLE scan_analysis COLUMNS scan_id, vg_process_id;
    "#;

    db.query(sql)
        .await
        .and_then(|r| r.check())
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    debug!("scan_analysis table initialized");
    Ok(())
}
