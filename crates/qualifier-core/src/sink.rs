//! Where a run's outcome, scan data and audit trail end up.
//!
//! The CSV implementations write one file each into an output directory.
//! The memory implementations keep everything in vectors for tests and
//! embedding callers.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::audit::AuditLogEntry;
use crate::outcome::{EligibilityOutcome, ScanDataRow};

pub const RESULTS_FILE: &str = "Qualifier_results.csv";
pub const LOG_FILE: &str = "QualifierLogDetails.csv";
pub const SCAN_DATA_FILE: &str = "Qualifer_scan_data.csv";

const RESULTS_HEADER: &str = "PatientID,Eye,ResultID,Message";
const LOG_HEADER: &str = "OperationID,Details,ActionTypeID,StatusTypeID,InsertionTime";
const SCAN_DATA_HEADER: &str = "ScanID,VGAup,DNAup,StudyEye";

/// Receives audit entries in insertion order.
pub trait LogSink {
    fn append(&mut self, entry: &AuditLogEntry) -> io::Result<()>;
}

/// Receives the run's terminal outcome and the scans the eligibility gate
/// looked at.
pub trait OutcomeRecorder {
    fn record_outcome(&mut self, outcome: &EligibilityOutcome) -> io::Result<()>;
    fn record_scan_data(&mut self, rows: &[ScanDataRow]) -> io::Result<()>;
}

/// Quote a field if it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Audit log written to `QualifierLogDetails.csv`. The file is truncated on
/// creation and flushed after every entry.
#[derive(Debug)]
pub struct CsvLogSink {
    path: PathBuf,
    file: File,
}

impl CsvLogSink {
    pub fn create(dir: &Path) -> io::Result<Self> {
        let path = dir.join(LOG_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        writeln!(file, "{}", LOG_HEADER)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for CsvLogSink {
    fn append(&mut self, entry: &AuditLogEntry) -> io::Result<()> {
        writeln!(
            self.file,
            "{},{},{},{},{}",
            entry.operation_id.0,
            csv_field(&entry.details),
            entry.action_type.id(),
            entry.status_type.id(),
            entry.inserted_at.format("%Y-%m-%d %H:%M:%S%.3f"),
        )?;
        self.file.flush()
    }
}

/// Outcome and scan data written to `Qualifier_results.csv` and
/// `Qualifer_scan_data.csv`. Each call overwrites its file.
#[derive(Debug, Clone)]
pub struct CsvOutcomeRecorder {
    dir: PathBuf,
}

impl CsvOutcomeRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(RESULTS_FILE)
    }

    pub fn scan_data_path(&self) -> PathBuf {
        self.dir.join(SCAN_DATA_FILE)
    }
}

impl OutcomeRecorder for CsvOutcomeRecorder {
    fn record_outcome(&mut self, outcome: &EligibilityOutcome) -> io::Result<()> {
        let mut out = String::new();
        out.push_str(RESULTS_HEADER);
        out.push('\n');
        out.push_str(&format!(
            "{},{},{},{}\n",
            outcome.patient_id,
            outcome.eye.as_char(),
            outcome.result.id(),
            csv_field(&outcome.message),
        ));
        std::fs::write(self.results_path(), out)
    }

    fn record_scan_data(&mut self, rows: &[ScanDataRow]) -> io::Result<()> {
        let mut out = String::new();
        out.push_str(SCAN_DATA_HEADER);
        out.push('\n');
        for row in rows {
            out.push_str(&format!(
                "{},{},{},{}\n",
                row.scan_id,
                row.vg_process_id,
                row.dn_process_id,
                u8::from(row.study_eye),
            ));
        }
        std::fs::write(self.scan_data_path(), out)
    }
}

#[derive(Debug, Default)]
pub struct MemoryLogSink {
    pub entries: Vec<AuditLogEntry>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn details(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.details.as_str()).collect()
    }
}

impl LogSink for MemoryLogSink {
    fn append(&mut self, entry: &AuditLogEntry) -> io::Result<()> {
        self.entries.push(entry.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryOutcomeRecorder {
    pub outcomes: Vec<EligibilityOutcome>,
    /// `None` until scan data is recorded.
    pub scan_data: Option<Vec<ScanDataRow>>,
}

impl MemoryOutcomeRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutcomeRecorder for MemoryOutcomeRecorder {
    fn record_outcome(&mut self, outcome: &EligibilityOutcome) -> io::Result<()> {
        self.outcomes.push(outcome.clone());
        Ok(())
    }

    fn record_scan_data(&mut self, rows: &[ScanDataRow]) -> io::Result<()> {
        self.scan_data = Some(rows.to_vec());
        Ok(())
    }
}
