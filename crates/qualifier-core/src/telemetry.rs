//! Tracing setup for the qualifier binary.
//!
//! Logs go to stderr. Stdout carries the qualifier report, plain or JSON,
//! so a caller can pipe it without filtering log lines out.
//!
//! [`init_tracing`] installs the global subscriber. Later calls do nothing.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install an `EnvFilter` subscriber writing to stderr.
///
/// `RUST_LOG` wins over `level` when set. With `json` every log line is a
/// JSON object.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    }
}
