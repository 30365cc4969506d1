//! Rotating log system
//!
//! Logs to the console and to daily-rotated files (`aqtraffic.YYYY-MM-DD.log`).

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,aqtraffic=debug";

/// Initialize console + rotating file logging.
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the whole program.
pub fn init_logging(log_dir: &str) -> std::io::Result<WorkerGuard> {
    let log_path = Path::new(log_dir);
    if !log_path.exists() {
        std::fs::create_dir_all(log_path)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "aqtraffic.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG overrides the default
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Logging initialized. Log directory: {}", log_dir);
    Ok(guard)
}
