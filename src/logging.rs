//!
//! src/logging.rs  Andrew Belles  Oct 18th, 2026
//!
//! Initializes logger. Logs go to stderr so stdout only ever
//! carries the recommendations themselves
//!
//!

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::SimilarError;

/// Flushes buffered log lines when dropped, hold it for the whole run
pub struct LoggingGuard(#[allow(dead_code)] tracing_appender::non_blocking::WorkerGuard);

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, SimilarError> {
    let (writer, guard) = non_blocking(std::io::stderr());
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(cfg.filter_directives.clone()));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let installed = match cfg.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(UtcTime::rfc_3339())
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .with_ansi(false)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true);
            registry.with(fmt_layer).try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(UtcTime::rfc_3339())
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .with_ansi(cfg.with_ansi);
            registry.with(fmt_layer).try_init()
        }
    };

    installed.map_err(|e| SimilarError::Config(format!("logging init: {e}")))?;
    Ok( LoggingGuard(guard) )
}
