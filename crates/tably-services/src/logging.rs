//! `tracing` setup for hosts embedding the engine
//!
//! Hosts call [`init`] once at startup. Console output is pretty-printed for
//! development; the file layer writes JSON lines to a daily rolling log that
//! can be attached to bug reports.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Engine crates that get their own filter directive
const ENGINE_TARGETS: &[&str] = &[
    "tably_core",
    "tably_filter",
    "tably_table",
    "tably_cache",
    "tably_monitor",
    "tably_services",
];

const LOG_FILE_PREFIX: &str = "tably.log";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for the rolling JSON log
    pub log_dir: PathBuf,
    pub enable_json_logs: bool,
    pub enable_console_logs: bool,
    /// Include file and line in console output
    pub include_location: bool,
    /// Emit span open/close events (useful for timing store calls)
    pub enable_spans: bool,
    /// Used when `RUST_LOG` is unset
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl LoggingConfig {
    /// JSON file only, engine crates at info
    pub fn production() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: true,
            enable_console_logs: false,
            include_location: false,
            enable_spans: false,
            default_filter: filter_directives("warn", "info"),
        }
    }

    /// Pretty console and JSON file, engine crates at debug
    pub fn development() -> Self {
        Self {
            log_dir: log_directory(),
            enable_json_logs: true,
            enable_console_logs: true,
            include_location: cfg!(debug_assertions),
            enable_spans: cfg!(debug_assertions),
            default_filter: filter_directives("info", "debug"),
        }
    }

    /// Console only, nothing written to disk
    pub fn testing() -> Self {
        Self {
            log_dir: std::env::temp_dir().join("tably-tests"),
            enable_json_logs: false,
            enable_console_logs: true,
            include_location: true,
            enable_spans: true,
            default_filter: "debug".to_string(),
        }
    }
}

/// `"<base>,tably_core=<engine>,..."`
pub fn filter_directives(base: &str, engine: &str) -> String {
    let mut directives = vec![base.to_string()];
    directives.extend(ENGINE_TARGETS.iter().map(|target| format!("{}={}", target, engine)));
    directives.join(",")
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when JSON logs are enabled; keep it alive
/// for the lifetime of the process or buffered lines are lost on exit. Fails
/// if a global subscriber is already installed.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG takes precedence over the configured default
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // NEW rather than ENTER: async spans are re-entered on every poll
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_span_events(span_events.clone())
                .with_ansi(true)
                .pretty()
                .with_filter(env_filter.clone())
                .boxed(),
        );
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        layers.push(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(span_events)
                .with_ansi(false)
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(non_blocking)
                .with_filter(env_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::info!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        console_enabled = config.enable_console_logs,
        "Logging initialized"
    );

    Ok(guard)
}

/// [`init`] with the development config in debug builds and the production
/// config otherwise
pub fn init_default() -> anyhow::Result<Option<WorkerGuard>> {
    let config = if cfg!(debug_assertions) {
        LoggingConfig::development()
    } else {
        LoggingConfig::production()
    };
    init(config)
}

pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tably")
        .join("logs")
}
