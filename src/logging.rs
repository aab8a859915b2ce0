//! Logging setup.
//!
//! Console logging goes to stderr so it never interleaves with the console
//! actuator's dialogue on stdout. An optional daily-rolling log file is
//! written to an XDG-compliant location, by default
//! `~/.local/share/furhat-dialogue/logs/`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Logging configuration, the `[logging]` table of the configuration file.
///
/// # Example
///
/// ```rust
/// use furhat_dialogue::logging::{LogLevel, LoggingConfig};
///
/// let config = LoggingConfig::new()
///     .with_file(true)
///     .with_level(LogLevel::Debug);
/// assert!(config.file);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether to also write a rolling log file.
    pub file: bool,
    /// Log files are named `{app_name}.log` with daily rotation.
    pub app_name: String,
    /// Custom log directory. If None, uses XDG data dir + "furhat-dialogue/logs".
    pub log_dir: Option<PathBuf>,
    /// Default level; `RUST_LOG` takes precedence when set.
    pub level: LogLevel,
}

impl LoggingConfig {
    /// Creates a new LoggingConfig with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the log file.
    #[must_use]
    pub fn with_file(mut self, enabled: bool) -> Self {
        self.file = enabled;
        self
    }

    /// Sets a custom log directory.
    #[must_use]
    pub fn with_log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(path.into());
        self
    }

    /// Sets the log level filter.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: false,
            app_name: "furhat-dialogue".to_string(),
            log_dir: None,
            level: LogLevel::default(),
        }
    }
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - most verbose.
    Trace,
    /// Debug level.
    Debug,
    /// Info level - default.
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level - least verbose.
    Error,
}

impl LogLevel {
    /// Converts to tracing_subscriber LevelFilter.
    #[must_use]
    pub fn to_filter(self) -> tracing_subscriber::filter::LevelFilter {
        match self {
            Self::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
            Self::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            Self::Info => tracing_subscriber::filter::LevelFilter::INFO,
            Self::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            Self::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(LoggingError::invalid_level(s)),
        }
    }
}

/// Guard that must be held to keep file logging active.
///
/// When dropped, flushes pending log lines to the file.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

impl fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingGuard").finish_non_exhaustive()
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingError {
    /// The specific error that occurred.
    pub kind: LoggingErrorKind,
}

/// Specific logging error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingErrorKind {
    /// Failed to determine XDG data directory.
    NoDataDir,
    /// Failed to create log directory.
    CreateDirFailed {
        /// The path that could not be created.
        path: PathBuf,
        /// The reason for failure.
        reason: String,
    },
    /// Subscriber initialization failed.
    SubscriberInitFailed {
        /// The reason for failure.
        reason: String,
    },
    /// A log level name was not recognized.
    InvalidLevel {
        /// The rejected value.
        value: String,
    },
}

impl LoggingError {
    /// Creates a new LoggingError with the given kind.
    #[must_use]
    pub fn new(kind: LoggingErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an error for missing XDG data directory.
    #[must_use]
    pub fn no_data_dir() -> Self {
        Self::new(LoggingErrorKind::NoDataDir)
    }

    /// Creates an error for failed directory creation.
    #[must_use]
    pub fn create_dir_failed(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::CreateDirFailed {
            path,
            reason: reason.into(),
        })
    }

    /// Creates an error for subscriber initialization failure.
    #[must_use]
    pub fn subscriber_init_failed(reason: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::SubscriberInitFailed {
            reason: reason.into(),
        })
    }

    /// Creates an error for an unknown level name.
    #[must_use]
    pub fn invalid_level(value: impl Into<String>) -> Self {
        Self::new(LoggingErrorKind::InvalidLevel {
            value: value.into(),
        })
    }

    /// Returns true if this is a missing data directory error.
    #[must_use]
    pub fn is_no_data_dir(&self) -> bool {
        matches!(self.kind, LoggingErrorKind::NoDataDir)
    }
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LoggingErrorKind::NoDataDir => {
                write!(
                    f,
                    "could not determine XDG data directory; \
                     set XDG_DATA_HOME or use a custom log_dir"
                )
            }
            LoggingErrorKind::CreateDirFailed { path, reason } => {
                write!(
                    f,
                    "failed to create log directory '{}': {}; check permissions",
                    path.display(),
                    reason
                )
            }
            LoggingErrorKind::SubscriberInitFailed { reason } => {
                write!(
                    f,
                    "failed to initialize tracing subscriber: {}; \
                     a subscriber may already be set",
                    reason
                )
            }
            LoggingErrorKind::InvalidLevel { value } => {
                write!(
                    f,
                    "unknown log level '{}'; expected trace, debug, info, warn or error",
                    value
                )
            }
        }
    }
}

impl std::error::Error for LoggingError {}

/// Returns the directory log files are written to.
///
/// # Errors
///
/// Returns `LoggingError::no_data_dir` if no custom directory is set and the
/// XDG data directory cannot be determined.
pub fn log_dir(config: &LoggingConfig) -> Result<PathBuf, LoggingError> {
    if let Some(ref custom_dir) = config.log_dir {
        return Ok(custom_dir.clone());
    }

    dirs::data_local_dir()
        .map(|dir| dir.join("furhat-dialogue").join("logs"))
        .ok_or_else(LoggingError::no_data_dir)
}

/// Installs the global tracing subscriber.
///
/// Returns a guard when a log file is configured; hold it for the lifetime of
/// the program.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
///
/// # Example
///
/// ```rust,ignore
/// use furhat_dialogue::logging::{self, LoggingConfig};
///
/// let _guard = logging::init(&LoggingConfig::default())?;
/// tracing::info!("logging active");
/// ```
pub fn init(config: &LoggingConfig) -> Result<Option<LoggingGuard>, LoggingError> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.to_filter().into())
        .from_env_lossy();

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = if config.file {
        let dir = log_dir(config)?;
        std::fs::create_dir_all(&dir)
            .map_err(|e| LoggingError::create_dir_failed(dir.clone(), e.to_string()))?;

        let file_appender =
            tracing_appender::rolling::daily(&dir, format!("{}.log", config.app_name));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(LoggingGuard { _guard: guard }))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::subscriber_init_failed(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_config_default_values() {
        let config = LoggingConfig::default();
        assert!(!config.file);
        assert_eq!(config.app_name, "furhat-dialogue");
        assert!(config.log_dir.is_none());
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn logging_config_builder_pattern() {
        let config = LoggingConfig::new()
            .with_file(true)
            .with_log_dir("/tmp/logs")
            .with_level(LogLevel::Debug);

        assert!(config.file);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.level, LogLevel::Debug);
    }

    #[test]
    fn log_level_from_str() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        let err = "loud".parse::<LogLevel>().unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn log_level_to_filter() {
        use tracing_subscriber::filter::LevelFilter;
        assert_eq!(LogLevel::Trace.to_filter(), LevelFilter::TRACE);
        assert_eq!(LogLevel::Error.to_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn log_dir_prefers_custom() {
        let config = LoggingConfig::new().with_log_dir("/var/log/furhat");
        assert_eq!(log_dir(&config).unwrap(), PathBuf::from("/var/log/furhat"));
    }

    #[test]
    fn log_dir_default_ends_with_app_logs() {
        if let Ok(dir) = log_dir(&LoggingConfig::default()) {
            assert!(dir.ends_with("furhat-dialogue/logs"));
        }
    }

    #[test]
    fn logging_config_parses_from_toml() {
        let config: LoggingConfig = toml::from_str("file = true\nlevel = \"warn\"").unwrap();
        assert!(config.file);
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.app_name, "furhat-dialogue");
    }

    #[test]
    fn error_display_has_hint() {
        let err = LoggingError::create_dir_failed(PathBuf::from("/x"), "denied");
        assert!(err.to_string().contains("check permissions"));
        assert!(LoggingError::no_data_dir().is_no_data_dir());
    }
}
