//! Unified logging module for the VFD services
//!
//! Console output uses a compact bracketed format (`timestamp [LEVEL] message`).
//! An optional daily-rolling file layer is written through a non-blocking
//! `tracing-appender` worker. `RUST_LOG` overrides the configured filter.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use errors::{VfdError, VfdResult};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2026-03-02T00:50:44.809123Z [INFO] vfdmaster started`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Keeps the non-blocking file worker alive for the lifetime of the process
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name (e.g., "vfdmaster", "vfdsim")
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is not set
    pub filter: String,
    /// Emit ANSI colors on the console
    pub ansi: bool,
    /// Directory for the daily log file; `None` disables file output
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
            filter: "info".to_string(),
            ansi: true,
            log_dir: None,
        }
    }
}

impl LogConfig {
    /// Effective filter string, `RUST_LOG` wins over the configured directive
    pub fn effective_filter(&self) -> String {
        match std::env::var("RUST_LOG") {
            Ok(env) if !env.trim().is_empty() => env,
            _ => self.filter.clone(),
        }
    }

    /// File name prefix for the daily log, e.g. `vfdmaster.log.2026-10-19`
    pub fn file_prefix(&self) -> String {
        format!("{}.log", self.service_name)
    }
}

/// Initialize logging system with configuration
pub fn init_with_config(config: LogConfig) -> VfdResult<()> {
    let filter_str = config.effective_filter();
    let env_filter = EnvFilter::try_new(&filter_str).map_err(|e| VfdError::InvalidConfig {
        field: "logging.level".to_string(),
        reason: format!("'{}': {}", filter_str, e),
    })?;

    let console_layer = fmt::layer()
        .with_ansi(config.ansi)
        .event_format(BracketedLevelFormat)
        .boxed();

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, config.file_prefix());
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
            match guards.lock() {
                Ok(mut guards) => guards.push(guard),
                Err(poisoned) => {
                    eprintln!("Warning: GUARDS lock was poisoned, recovering...");
                    poisoned.into_inner().push(guard);
                },
            }

            Some(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(BracketedLevelFormat)
                    .boxed(),
            )
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| VfdError::Internal(format!("Logging already initialized: {}", e)))?;

    match &config.log_dir {
        Some(dir) => tracing::info!("Logging: {} @ {:?}", config.service_name, dir),
        None => tracing::info!("Logging: {} (console only)", config.service_name),
    }

    Ok(())
}
