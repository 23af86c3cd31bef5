//! Global initialization utilities for the application

use std::path::PathBuf;
use std::sync::Once;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

static INIT: Once = Once::new();

/// Initialize the application environment
///
/// Loads variables from a `.env` file in the current directory or any parent.
/// Safe to call multiple times - will only run once
pub fn initialize_environment() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
    });
}

/// Options for the global tracing subscriber
#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Default filter directive when `RUST_LOG` is not set (e.g. "info")
    pub level: String,
    /// Emit JSON records instead of human-readable lines
    pub json: bool,
    /// Also write a daily-rotated log file into this directory
    pub log_dir: Option<PathBuf>,
    /// File name prefix for the rotated log file
    pub file_prefix: String,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_dir: None,
            file_prefix: "gitscope.log".to_string(),
        }
    }
}

/// Keeps non-blocking writers flushing; drop only at process exit
#[must_use = "dropping the guards stops log output"]
pub struct TracingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Install the global tracing subscriber
///
/// Stderr is always written through a non-blocking writer. When `log_dir` is set
/// a daily rolling file is added next to it.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init_tracing(
    options: &TracingOptions,
) -> Result<TracingGuards, Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))?;

    let (stderr_writer, stderr_guard): (NonBlocking, WorkerGuard) =
        tracing_appender::non_blocking(std::io::stderr());

    let mut guards = vec![stderr_guard];

    if let Some(log_dir) = &options.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, log_dir, &options.file_prefix);
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guards.push(file_guard);

        let writer = file_writer.and(stderr_writer);
        if options.json {
            tracing_subscriber::fmt()
                .json()
                .with_writer(writer)
                .with_env_filter(filter)
                .try_init()?;
        } else {
            tracing_subscriber::fmt()
                .with_writer(writer)
                .with_env_filter(filter)
                .try_init()?;
        }
    } else if options.json {
        tracing_subscriber::fmt()
            .json()
            .with_writer(stderr_writer)
            .with_env_filter(filter)
            .try_init()?;
    } else {
        tracing_subscriber::fmt()
            .with_writer(stderr_writer)
            .with_env_filter(filter)
            .try_init()?;
    }

    Ok(TracingGuards { _guards: guards })
}
