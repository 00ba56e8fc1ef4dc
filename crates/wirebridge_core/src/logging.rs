//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Start rolling file logs once per process for the wiring runtime.
//! - Tag the process with a run id so records from one startup can be grouped.
//! - Capture panics raised during startup wiring as log records.
//!
//! # Invariants
//! - Initialization is idempotent for identical level and directory.
//! - A second initialization with a different level or directory is rejected.
//! - The run id is fixed by the first successful initialization.
//! - Initialization never panics.

use crate::config::LoggingOptions;
use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const LOG_FILE_BASENAME: &str = "wirebridge";
const MAX_PANIC_PAYLOAD_CHARS: usize = 200;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct LoggingState {
    status: LoggingStatus,
    _logger: LoggerHandle,
}

/// Active logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingStatus {
    pub level: &'static str,
    pub log_dir: PathBuf,
    /// Id written into every bootstrap and panic record of this process.
    pub run_id: Uuid,
}

/// Logging bootstrap failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnsupportedLevel(String),
    EmptyDirectory,
    RelativeDirectory(String),
    /// Zero rotation size or zero kept files.
    InvalidRotation { rotate_bytes: u64, keep_files: usize },
    CreateDirectory { path: PathBuf, message: String },
    Backend(String),
    LevelConflict { active: &'static str, requested: &'static str },
    DirectoryConflict { active: PathBuf, requested: PathBuf },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(value) => write!(
                f,
                "unsupported log level `{value}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyDirectory => write!(f, "log_dir cannot be empty"),
            Self::RelativeDirectory(value) => {
                write!(f, "log_dir must be an absolute path, got `{value}`")
            }
            Self::InvalidRotation {
                rotate_bytes,
                keep_files,
            } => write!(
                f,
                "log rotation needs positive limits, got rotate_bytes={rotate_bytes} keep_files={keep_files}"
            ),
            Self::CreateDirectory { path, message } => write!(
                f,
                "failed to create log directory `{}`: {message}",
                path.display()
            ),
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
            Self::LevelConflict { active, requested } => write!(
                f,
                "logging already initialized with level `{active}`; refusing to switch to `{requested}`"
            ),
            Self::DirectoryConflict { active, requested } => write!(
                f,
                "logging already initialized at `{}`; refusing to switch to `{}`",
                active.display(),
                requested.display()
            ),
        }
    }
}

impl Error for LoggingError {}

/// Starts rolling file logging and returns the process run id.
///
/// # Errors
/// - `UnsupportedLevel`, `EmptyDirectory`, `RelativeDirectory`,
///   `InvalidRotation` for bad options.
/// - `CreateDirectory` / `Backend` when the logger cannot start.
/// - `LevelConflict` / `DirectoryConflict` when already started differently.
pub fn init_logging(options: &LoggingOptions) -> Result<Uuid, LoggingError> {
    let level = normalize_level(&options.level)?;
    let log_dir = normalize_log_dir(&options.log_dir)?;
    if options.rotate_bytes == 0 || options.keep_files == 0 {
        return Err(LoggingError::InvalidRotation {
            rotate_bytes: options.rotate_bytes,
            keep_files: options.keep_files,
        });
    }

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(level, &log_dir, options))?;
    ensure_same_config(&state.status, level, &log_dir)?;
    Ok(state.status.run_id)
}

/// Returns the active configuration once logging is started.
pub fn logging_status() -> Option<LoggingStatus> {
    LOGGING_STATE.get().map(|state| state.status.clone())
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(
    level: &'static str,
    log_dir: &Path,
    options: &LoggingOptions,
) -> Result<LoggingState, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|err| LoggingError::CreateDirectory {
        path: log_dir.to_path_buf(),
        message: err.to_string(),
    })?;

    let mirror = if options.mirror_warnings {
        Duplicate::Warn
    } else {
        Duplicate::None
    };
    let file_spec = FileSpec::default()
        .directory(log_dir)
        .basename(LOG_FILE_BASENAME);
    let logger = Logger::try_with_str(level)
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(file_spec)
        .duplicate_to_stderr(mirror)
        .rotate(
            Criterion::Size(options.rotate_bytes),
            Naming::Numbers,
            Cleanup::KeepLogFiles(options.keep_files),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    let run_id = Uuid::new_v4();
    install_panic_hook_once(run_id);

    info!(
        "event=logging_init module=logging status=ok run_id={} level={} log_dir={} rotate_bytes={} keep_files={} version={}",
        run_id,
        level,
        log_dir.display(),
        options.rotate_bytes,
        options.keep_files,
        env!("CARGO_PKG_VERSION")
    );

    Ok(LoggingState {
        status: LoggingStatus {
            level,
            log_dir: log_dir.to_path_buf(),
            run_id,
        },
        _logger: logger,
    })
}

fn ensure_same_config(
    active: &LoggingStatus,
    level: &'static str,
    log_dir: &Path,
) -> Result<(), LoggingError> {
    if active.log_dir != log_dir {
        return Err(LoggingError::DirectoryConflict {
            active: active.log_dir.clone(),
            requested: log_dir.to_path_buf(),
        });
    }
    if active.level != level {
        return Err(LoggingError::LevelConflict {
            active: active.level,
            requested: level,
        });
    }
    Ok(())
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn normalize_log_dir(log_dir: &str) -> Result<PathBuf, LoggingError> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err(LoggingError::EmptyDirectory);
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(LoggingError::RelativeDirectory(trimmed.to_string()));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook_once(run_id: Uuid) {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let thread = std::thread::current();
        error!(
            "event=panic_captured module=logging status=error run_id={} thread={} location={} payload={}",
            run_id,
            thread.name().unwrap_or("unnamed"),
            location,
            single_line(panic_text(panic_info.payload()), MAX_PANIC_PAYLOAD_CHARS)
        );
        previous_hook(panic_info);
    }));
}

fn panic_text(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "non-string panic payload"
    }
}

// Records are one line of key=value pairs.
fn single_line(value: &str, max_chars: usize) -> String {
    let mut line: String = value
        .chars()
        .take(max_chars)
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .collect();
    if value.chars().nth(max_chars).is_some() {
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, normalize_log_dir, panic_text,
        single_line, LoggingError,
    };
    use crate::config::LoggingOptions;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("WARNING").expect("warning"), "warn");
        assert_eq!(normalize_level(" Trace ").expect("trace"), "trace");
        assert_eq!(
            normalize_level("verbose").expect_err("verbose is unsupported"),
            LoggingError::UnsupportedLevel("verbose".to_string())
        );
    }

    #[test]
    fn normalize_log_dir_rejects_empty_and_relative_paths() {
        assert_eq!(
            normalize_log_dir("  ").expect_err("empty dir"),
            LoggingError::EmptyDirectory
        );
        assert!(matches!(
            normalize_log_dir("logs/dev").expect_err("relative dir"),
            LoggingError::RelativeDirectory(_)
        ));
    }

    #[test]
    fn single_line_flattens_and_truncates() {
        assert_eq!(single_line("first\nsecond\rthird", 10), "first seco...");
        assert_eq!(single_line("short", 10), "short");
    }

    #[test]
    fn panic_text_reads_string_payloads() {
        let owned: Box<dyn std::any::Any + Send> = Box::new("owned".to_string());
        let borrowed: Box<dyn std::any::Any + Send> = Box::new("borrowed");
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_text(owned.as_ref()), "owned");
        assert_eq!(panic_text(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_text(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn zero_rotation_limits_are_rejected() {
        let mut options = LoggingOptions::new("info", "/tmp/wirebridge-logs");
        options.keep_files = 0;
        assert_eq!(
            init_logging(&options).expect_err("zero kept files must fail"),
            LoggingError::InvalidRotation {
                rotate_bytes: options.rotate_bytes,
                keep_files: 0,
            }
        );
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_conflicts() {
        let first = tempfile::tempdir().expect("temp dir");
        let second = tempfile::tempdir().expect("temp dir");
        let first_dir = first.path().to_str().expect("utf-8 path").to_string();
        let second_dir = second.path().to_str().expect("utf-8 path").to_string();

        let run_id = init_logging(&LoggingOptions::new("info", &first_dir)).expect("first init");
        assert!(!run_id.is_nil());
        let again = init_logging(&LoggingOptions::new("INFO", &first_dir)).expect("same options");
        assert_eq!(again, run_id);

        let err = init_logging(&LoggingOptions::new("debug", &first_dir))
            .expect_err("level conflict must fail");
        assert!(matches!(err, LoggingError::LevelConflict { .. }));

        let err = init_logging(&LoggingOptions::new("info", &second_dir))
            .expect_err("directory conflict must fail");
        assert!(matches!(err, LoggingError::DirectoryConflict { .. }));

        let status = logging_status().expect("logging active");
        assert_eq!(status.level, "info");
        assert_eq!(status.log_dir, first.path());
        assert_eq!(status.run_id, run_id);
    }
}
