//! Structured logging for the fleet coordinators.
//!
//! Log levels:
//! - ERROR: Pipeline runs that ended in a failed task record
//! - WARN: Recoverable conditions (timed-out sub-workers, dropped records)
//! - INFO: Task submitted/completed, reports, startup
//! - DEBUG: Stage and dispatch traces
//! - TRACE: Per sub-worker invocations
//!
//! Debug mode can be enabled with `--debug` flag or `FLEET_DEBUG=1` env var.
//! Every line carries a component tag, e.g. `[INFO] [pipeline] ...`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Log levels for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Default log file location: ~/.fleet/fleet.log
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".fleet").join("fleet.log"))
}

/// Initialize logging with explicit debug mode setting.
///
/// `FLEET_DEBUG=1` forces debug mode regardless of the flag.
pub fn init(debug: bool) {
    if let Some(path) = default_path() {
        init_at(&path, debug);
    } else {
        set_level(level_for(debug));
    }
}

/// Initialize logging into a specific file. The file is truncated.
///
/// Only the first initialization picks the path; later calls adjust the level.
pub fn init_at(path: &Path, debug: bool) {
    set_level(level_for(debug));

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if LOG_PATH.set(path.to_path_buf()).is_ok() {
        let _ = std::fs::write(path, "");
    }
}

fn level_for(debug: bool) -> LogLevel {
    let env_debug = std::env::var("FLEET_DEBUG")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    if debug || env_debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

/// Check if debug (or trace) output is enabled.
pub fn is_debug() -> bool {
    get_level() >= LogLevel::Debug
}

/// Set the minimum log level for output.
pub fn set_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Get the current log level.
pub fn get_level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Log a message for a component at the specified level.
pub fn log_at(level: LogLevel, component: &str, msg: &str) {
    if level > get_level() {
        return;
    }

    if let Some(path) = LOG_PATH.get() {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", format_line(level, component, msg));
        }
    }
}

fn format_line(level: LogLevel, component: &str, msg: &str) -> String {
    let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
    format!("[{}] [{}] [{}] {}", timestamp, level.as_str(), component, msg)
}

/// Log macro for INFO level. The first argument is the component tag.
#[macro_export]
macro_rules! flog {
    ($component:expr, $($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Info, $component, &format!($($arg)*))
    };
}

/// Log macro for ERROR level.
#[macro_export]
macro_rules! flog_error {
    ($component:expr, $($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Error, $component, &format!($($arg)*))
    };
}

/// Log macro for WARN level.
#[macro_export]
macro_rules! flog_warn {
    ($component:expr, $($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Warn, $component, &format!($($arg)*))
    };
}

/// Log macro for DEBUG level (only logs when debug mode is enabled).
#[macro_export]
macro_rules! flog_debug {
    ($component:expr, $($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Debug, $component, &format!($($arg)*))
    };
}

/// Log macro for TRACE level.
#[macro_export]
macro_rules! flog_trace {
    ($component:expr, $($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Trace, $component, &format!($($arg)*))
    };
}
