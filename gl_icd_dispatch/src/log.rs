//! Dispatch diagnostics
//!
//! Every component reports through the process-wide logger held by `Icd`.
//! Entries carry a source tag naming the component (`glicd::Dispatcher`,
//! `glicd::DriverLoader`, `glicd::Icd`) and, for errors, the file and line
//! that raised them.
//!
//! The built-in console logger drops anything below its threshold. The
//! threshold defaults to Warn and is read from `GL_ICD_LOG`
//! (`trace`, `debug`, `info`, `warn` or `error`).

use std::env;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use colored::*;

/// Environment variable holding the console logger's threshold
pub const LOG_ENV_VAR: &str = "GL_ICD_LOG";

/// Threshold used when `GL_ICD_LOG` is unset or unrecognized
pub const DEFAULT_MIN_SEVERITY: LogSeverity = LogSeverity::Warn;

/// Sink for dispatch diagnostics
///
/// Hosts that have their own log install one with `Icd::set_logger`.
///
/// ```no_run
/// use gl_icd_dispatch::glicd::log::{Logger, LogEntry};
///
/// struct HostLogger;
///
/// impl Logger for HostLogger {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{}: {}", entry.source, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One diagnostic
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Reporting component, e.g. "glicd::Dispatcher"
    pub source: String,
    pub message: String,
    /// Set by `icd_error!` only
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Binding transitions, once per make-current
    Trace,
    /// Rejected client calls (stale handle, busy context, nothing current)
    Debug,
    /// Driver loaded, context created or deleted
    Info,
    /// Candidate driver skipped, context left alive at teardown
    Warn,
    /// Driver failures and registry faults
    Error,
}

impl LogSeverity {
    /// Parse a threshold name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    fn label(self) -> ColoredString {
        match self {
            Self::Trace => "TRACE".bright_black(),
            Self::Debug => "DEBUG".cyan(),
            Self::Info => "INFO ".green(),
            Self::Warn => "WARN ".yellow(),
            Self::Error => "ERROR".red().bold(),
        }
    }
}

/// Console logger writing to stderr
///
/// Lines look like `[timestamp] [SEVERITY] [source] message`, with
/// ` (file:line)` appended when the entry has a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultLogger {
    min_severity: LogSeverity,
}

impl DefaultLogger {
    pub fn new(min_severity: LogSeverity) -> Self {
        Self { min_severity }
    }

    /// Logger with the threshold named by `GL_ICD_LOG`
    pub fn from_env() -> Self {
        let min_severity = env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|value| LogSeverity::from_name(&value))
            .unwrap_or(DEFAULT_MIN_SEVERITY);
        Self::new(min_severity)
    }

    pub fn min_severity(&self) -> LogSeverity {
        self.min_severity
    }

    pub fn enabled(&self, severity: LogSeverity) -> bool {
        severity >= self.min_severity
    }

    fn format(&self, entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let mut line = format!(
            "[{}] [{}] [{}] {}",
            datetime.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.severity.label(),
            entry.source.bright_blue(),
            entry.message,
        );
        if let (Some(file), Some(number)) = (entry.file, entry.line) {
            line.push_str(&format!(" ({}:{})", file, number));
        }
        line
    }
}

impl Default for DefaultLogger {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SEVERITY)
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        if self.enabled(entry.severity) {
            eprintln!("{}", self.format(entry));
        }
    }
}

// ===== LOGGING MACROS =====

/// Log at an explicit severity, without location
#[macro_export]
macro_rules! icd_log {
    ($severity:expr, $source:expr, $($arg:tt)*) => {
        $crate::glicd::Icd::log($severity, $source, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! icd_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::icd_log!($crate::glicd::log::LogSeverity::Trace, $source, $($arg)*)
    };
}

#[macro_export]
macro_rules! icd_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::icd_log!($crate::glicd::log::LogSeverity::Debug, $source, $($arg)*)
    };
}

/// ```no_run
/// gl_icd_dispatch::icd_info!("glicd::DriverLoader", "Driver '{}' loaded", "nvoglv64");
/// ```
#[macro_export]
macro_rules! icd_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::icd_log!($crate::glicd::log::LogSeverity::Info, $source, $($arg)*)
    };
}

#[macro_export]
macro_rules! icd_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::icd_log!($crate::glicd::log::LogSeverity::Warn, $source, $($arg)*)
    };
}

/// Log an error together with the file and line that raised it
#[macro_export]
macro_rules! icd_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::glicd::Icd::log_detailed(
            $crate::glicd::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
