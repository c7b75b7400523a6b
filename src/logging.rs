//! Process-wide log sink and the per-monitor event log capability.
use std::path::Path;

use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "koth-agent.log";

/// Installs the global subscriber: JSON lines into a daily rolling file under
/// `log_dir`, human-readable output on stdout.
pub fn init_logging(log_dir: &Path) {
    let file_appender = rolling::daily(log_dir, LOG_FILE_NAME);
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

/// Severity-levelled sink that monitors report their tick outcomes to.
pub trait EventLog: Send + Sync {
    fn info(&self, flag: &Path, message: &str);
    fn warn(&self, flag: &Path, message: &str);
    /// Process-level failures that leave the agent unable to do its job.
    fn critical(&self, message: &str);
}

/// Forwards events to `tracing` with the flag path as a structured field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn info(&self, flag: &Path, message: &str) {
        info!(flag = %flag.display(), "{message}");
    }

    fn warn(&self, flag: &Path, message: &str) {
        warn!(flag = %flag.display(), "{message}");
    }

    fn critical(&self, message: &str) {
        error!(critical = true, "{message}");
    }
}
