//! Logging setup for Pacer.
//!
//! The library crates only emit `tracing` events. Hosts, test binaries and
//! benchmarks call [`init`] (or [`init_test`]) once to install a subscriber.

#![warn(missing_docs)]

use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Environment variable names.
pub mod vars {
    /// Minimum log level.
    pub const PACER_LOG_LEVEL: &str = "PACER_LOG_LEVEL";
    /// Output format: `pretty`, `compact` or `json`.
    pub const PACER_LOG_FORMAT: &str = "PACER_LOG_FORMAT";
    /// Emit span open/close events.
    pub const PACER_LOG_SPANS: &str = "PACER_LOG_SPANS";
    /// Standard fallback for the level.
    pub const RUST_LOG: &str = "RUST_LOG";
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Output format.
    pub format: LogFormat,
    /// Include span events.
    pub span_events: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl LogLevel {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON structured format.
    Json,
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        let level = std::env::var(vars::PACER_LOG_LEVEL)
            .or_else(|_| std::env::var(vars::RUST_LOG))
            .ok();
        if let Some(l) = level.as_deref().and_then(LogLevel::parse) {
            config.level = l;
        }

        if let Ok(format) = std::env::var(vars::PACER_LOG_FORMAT) {
            config.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }

        if let Ok(span_events) = std::env::var(vars::PACER_LOG_SPANS) {
            config.span_events = span_events.to_lowercase() == "true" || span_events == "1";
        }

        config
    }
}

/// Initialize logging with the given configuration.
///
/// `RUST_LOG` directives, when they parse, take precedence over
/// `config.level`.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_span_events(span_events),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_span_events(span_events))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_span_events(span_events))
            .try_init(),
    };

    result.map_err(|e| LogError::InitError(e.to_string()))
}

/// Install a subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call in a process installs
/// anything.
pub fn init_test() {
    let level = LogConfig::from_env().level;
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(level))
        .with_test_writer()
        .try_init();
}

/// Logging errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// A global subscriber was already installed or could not be built.
    #[error("failed to initialize logging: {0}")]
    InitError(String),
}
