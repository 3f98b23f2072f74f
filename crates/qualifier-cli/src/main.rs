//! Study-eye qualifier CLI
//!
//! `qualifier` evaluates one eye of one patient and writes three files into
//! the output directory:
//!
//! - `Qualifier_results.csv`: the outcome row
//! - `QualifierLogDetails.csv`: the audit trail
//! - `Qualifer_scan_data.csv`: the raster scans whose analysis was checked
//!
//! The process exits non-zero only when no outcome could be recorded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use qualifier_core::{
    CalibrationPolicy, CsvLogSink, CsvOutcomeRecorder, QualifierConfig, QualifierPipeline,
    QualifierReport,
};
use qualifier_state::{Eye, EyeIdentity, RepositoryConfig, SurrealScanRepository};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "qualifier")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Decide whether an eye qualifies for longitudinal monitoring", long_about = None)]
struct Cli {
    /// Patient id
    #[arg(short, long, env = "QUALIFIER_PATIENT_ID")]
    patient_id: i64,

    /// Eye to evaluate (L or R)
    #[arg(short, long, env = "QUALIFIER_EYE")]
    eye: Eye,

    /// Directory receiving the result, log and scan-data files
    #[arg(short, long, env = "QUALIFIER_OUTPUT_PATH")]
    output_path: PathBuf,

    /// Database endpoint (e.g. ws://10.0.0.5:8000, mem://)
    #[arg(short, long, env = "QUALIFIER_DB_ENDPOINT")]
    db_endpoint: String,

    #[arg(long, env = "QUALIFIER_DB_USERNAME")]
    db_username: Option<String>,

    #[arg(long, env = "QUALIFIER_DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,

    #[arg(long, env = "QUALIFIER_DB_NAMESPACE", default_value = "octanalysis")]
    db_namespace: String,

    #[arg(long, env = "QUALIFIER_DB_DATABASE", default_value = "main")]
    db_database: String,

    /// Credentials belong to a root user
    #[arg(long, env = "QUALIFIER_DB_ROOT")]
    db_root: bool,

    /// Only qualify enrolled study eyes (1) or skip that check (0)
    #[arg(short = 'j', long, value_parser = clap::value_parser!(u8).range(0..=1))]
    just_study_eye: u8,

    /// How calibration history gates the raster-scan count (successful|any)
    #[arg(long, default_value = "successful")]
    calibration_policy: CalibrationPolicy,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON log lines and print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn identity(&self) -> EyeIdentity {
        EyeIdentity::new(self.patient_id, self.eye)
    }

    fn qualifier_config(&self) -> QualifierConfig {
        QualifierConfig::default()
            .with_study_eye_gate(self.just_study_eye == 1)
            .with_calibration_policy(self.calibration_policy)
    }

    fn repository_config(&self) -> Result<RepositoryConfig> {
        let mut config = RepositoryConfig::new(&self.db_endpoint)
            .with_namespace(&self.db_namespace)
            .with_database(&self.db_database)
            .with_root(self.db_root);
        match (&self.db_username, &self.db_password) {
            (Some(user), Some(pass)) => config = config.with_credentials(user, pass),
            (None, None) => {}
            _ => anyhow::bail!("--db-username and --db-password must be given together"),
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    qualifier_core::init_tracing(cli.json, level);

    let report = run_qualifier(&cli).await?;
    print_report(&report, cli.json)
}

async fn run_qualifier(cli: &Cli) -> Result<QualifierReport> {
    let identity = cli.identity();
    let repo_config = cli.repository_config()?;
    prepare_output_dir(&cli.output_path)?;

    let mut log_sink = CsvLogSink::create(&cli.output_path).with_context(|| {
        format!(
            "Failed to create audit log in {}",
            cli.output_path.display()
        )
    })?;
    let mut recorder = CsvOutcomeRecorder::new(&cli.output_path);
    let mut pipeline = QualifierPipeline::new(
        cli.qualifier_config(),
        identity,
        &mut log_sink,
        &mut recorder,
    );
    info!(run_id = %pipeline.run_id(), eye = %identity, "Starting qualifier");

    pipeline.start()?;
    let repo = pipeline
        .connect(SurrealScanRepository::connect(&repo_config))
        .await
        .with_context(|| format!("Failed to connect to {}", repo_config.endpoint))?;

    let report = pipeline
        .run(&repo)
        .await
        .with_context(|| format!("Qualifier failed for {}", identity))?;
    Ok(report)
}

fn prepare_output_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create output directory {}", path.display()))
}

fn print_report(report: &QualifierReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let outcome = &report.outcome;
    println!(
        "{}/{}: {:?} ({})",
        outcome.patient_id,
        outcome.eye,
        outcome.result,
        outcome.result.id()
    );
    println!("{}", outcome.message);
    if !report.evaluated_scans.is_empty() {
        let ids: Vec<String> = report
            .evaluated_scans
            .iter()
            .map(|s| s.scan_id.to_string())
            .collect();
        println!("Evaluated scans: {}", ids.join(", "));
    }
    Ok(())
}
