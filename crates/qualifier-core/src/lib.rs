//! Qualifier core library
//!
//! Decides whether one eye of one patient qualifies for longitudinal
//! monitoring. Re-exports the pipeline, its gates, and the sinks that
//! persist what a run produced.

pub mod audit;
pub mod config;
pub mod error;
pub mod gates;
pub mod obs;
pub mod outcome;
pub mod pipeline;
pub mod sink;
pub mod telemetry;

pub use audit::{ActionType, AuditLog, AuditLogEntry, OperationId, StatusType};
pub use config::{CalibrationPolicy, QualifierConfig, Thresholds};
pub use error::{QualifierError, Result};
pub use gates::{GateDecision, GateKind, RasterSample};
pub use obs::{emit_gate_evaluated, emit_run_finished, emit_run_started, run_span};
pub use outcome::{EligibilityOutcome, ResultCode, ScanDataRow};
pub use pipeline::{QualifierPipeline, QualifierReport};
pub use sink::{
    CsvLogSink, CsvOutcomeRecorder, LogSink, MemoryLogSink, MemoryOutcomeRecorder,
    OutcomeRecorder,
};
pub use telemetry::init_tracing;

pub use qualifier_state::{Eye, EyeIdentity, ScanRepository};

/// Version of the qualifier crates.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
