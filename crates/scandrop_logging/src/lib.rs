//! Logging setup shared by the scandrop binaries.
//!
//! Every run writes to a daily log file under `~/.scandrop/logs` so that
//! unattended passes (cron, Task Scheduler) leave a trail, and mirrors the
//! same events to stderr for interactive use.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "scandrop=info,scandrop_logging=info";
const VERBOSE_LOG_FILTER: &str = "scandrop=debug,scandrop_logging=debug";
const MAX_LOG_FILES: usize = 14;

/// Logging options for a binary.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Overrides the default `~/.scandrop/logs` directory.
    pub log_dir: Option<PathBuf>,
}

/// Install the global subscriber: daily file layer plus stderr layer.
///
/// `RUST_LOG` wins over the built-in filters when set. The returned guard
/// flushes the file writer on drop and must live until the process exits.
pub fn init_logging(config: LogConfig<'_>) -> Result<WorkerGuard> {
    let log_dir = match config.log_dir {
        Some(dir) => dir,
        None => logs_dir().context("Could not determine the scandrop home directory")?,
    };
    let file_appender = file_appender(&log_dir, config.app_name)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if config.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(env_filter.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(env_filter),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(guard)
}

/// Daily-rotated `<app>.<date>.log` files in `dir`, oldest pruned past
/// [`MAX_LOG_FILES`].
fn file_appender(dir: &Path, app_name: &str) -> Result<RollingFileAppender> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(sanitize_name(app_name))
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// The scandrop home directory: `$SCANDROP_HOME` or `~/.scandrop`.
pub fn scandrop_home() -> Option<PathBuf> {
    if let Ok(override_path) = std::env::var("SCANDROP_HOME") {
        return Some(PathBuf::from(override_path));
    }
    dirs::home_dir().map(|home| home.join(".scandrop"))
}

/// The logs directory: `<home>/logs`.
pub fn logs_dir() -> Option<PathBuf> {
    scandrop_home().map(|home| home.join("logs"))
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize_name("scandrop"), "scandrop");
        assert_eq!(sanitize_name("scan drop/../x"), "scan_drop____x");
    }

    #[test]
    fn appender_writes_dated_file_in_nested_dir() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("home").join("logs");

        let mut appender = file_appender(&logs, "scan drop").unwrap();
        appender.write_all(b"pass complete\n").unwrap();
        appender.flush().unwrap();

        let files: Vec<_> = fs::read_dir(&logs)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("scan_drop."), "{name}");
        assert!(name.ends_with(".log"), "{name}");
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), "pass complete\n");
    }
}
