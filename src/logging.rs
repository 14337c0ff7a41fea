use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LEVEL: &str = "info";

/// Daily rolling file under `<data dir>/logs`, mirrored to stderr when
/// `show_stderr` is set.
pub fn enable_logging(data_dir: &Path, level: Option<&str>, show_stderr: bool) -> Result<()> {
    let appender = log_appender(data_dir)?;
    let stderr = std::io::stderr.with_filter(move |_| show_stderr);
    let level = level.unwrap_or(DEFAULT_LEVEL);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "{}={level}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
        )))
        .with_ansi(false)
        .with_writer(stderr.and(appender))
        .try_init()
        .map_err(|e| anyhow::anyhow!("initializing logging: {e}"))?;
    Ok(())
}

fn log_appender(data_dir: &Path) -> Result<RollingFileAppender> {
    let log_dir = data_dir.join("logs");
    // The appender prunes old files on build and complains if the directory is missing.
    fs::create_dir_all(&log_dir).with_context(|| format!("creating {:?}", log_dir))?;
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(7)
        .filename_prefix("internlog")
        .filename_suffix("log")
        .build(log_dir)?;
    Ok(appender)
}
