//! Logger bootstrap.
//!
//! Library code only talks to the `log` facade with `event=... module=...
//! status=...` messages; binaries call [`init_logging`] once at startup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use once_cell::sync::OnceCell;

const LOG_FILE_BASENAME: &str = "taskboard";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

/// Starts logging to rotating files in `log_dir`, or to stderr when no
/// directory is given.
///
/// Repeating the same call is a no-op; a call with a different level or
/// directory is rejected.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let level = normalize_level(level)?;
    let log_dir = log_dir.map(Path::to_path_buf);

    let state = LOGGING_STATE.get_or_try_init(|| -> anyhow::Result<LoggingState> {
        let logger = Logger::try_with_str(level)
            .with_context(|| format!("invalid log level `{level}`"))?;
        let logger = match &log_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {:?}", dir))?;
                logger
                    .log_to_file(
                        FileSpec::default()
                            .directory(dir.as_path())
                            .basename(LOG_FILE_BASENAME),
                    )
                    .rotate(
                        Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                        Naming::Numbers,
                        Cleanup::KeepLogFiles(MAX_LOG_FILES),
                    )
                    .write_mode(WriteMode::BufferAndFlush)
                    .append()
            }
            None => logger.log_to_stderr(),
        };
        let handle = logger
            .format(flexi_logger::detailed_format)
            .start()
            .context("failed to start logger")?;

        log::info!(
            "event=app_start module=logging status=ok version={} level={}",
            env!("CARGO_PKG_VERSION"),
            level
        );
        Ok(LoggingState {
            level,
            log_dir: log_dir.clone(),
            _logger: handle,
        })
    })?;

    if state.level != level || state.log_dir != log_dir {
        anyhow::bail!(
            "logging already initialized with level `{}` at {:?}; refusing to switch to `{}` at {:?}",
            state.level,
            state.log_dir,
            level,
            log_dir
        );
    }
    Ok(())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn normalize_level(level: &str) -> anyhow::Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => anyhow::bail!("unsupported log level `{other}`; expected trace|debug|info|warn|error"),
    }
}
