// logsift - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation; every variant keeps its cause so the
// full chain can be logged.
//
// Note what is NOT here: the sanitizer and classifier cannot fail, and buffer
// overflow is an eviction policy rather than an error.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::core::model::Channel;

/// Top-level error type for all logsift operations.
#[derive(Debug)]
pub enum LogSiftError {
    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Producer-side streaming control failed.
    Stream(StreamError),

    /// A worker process could not be launched.
    Worker(WorkerError),

    /// Structured output could not be serialised.
    Json(serde_json::Error),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LogSiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Stream(e) => write!(f, "Streaming error: {e}"),
            Self::Worker(e) => write!(f, "Worker error: {e}"),
            Self::Json(e) => write!(f, "JSON output error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogSiftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Stream(e) => Some(e),
            Self::Worker(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for LogSiftError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogSiftError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Stream control errors
// ---------------------------------------------------------------------------

/// Errors raised by a producer when asked to toggle streaming or hand over
/// its retained lines. The ingestion gate catches these and carries on.
#[derive(Debug)]
pub enum StreamError {
    /// The producer's shared state lock was poisoned by a panicking writer.
    StateLock,

    /// The producer is gone (e.g. the worker side was torn down).
    Disconnected { reason: String },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateLock => write!(f, "log store state lock is poisoned"),
            Self::Disconnected { reason } => write!(f, "log producer disconnected: {reason}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<StreamError> for LogSiftError {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

// ---------------------------------------------------------------------------
// Worker errors
// ---------------------------------------------------------------------------

/// Errors related to launching the worker processes whose output is tailed.
#[derive(Debug)]
pub enum WorkerError {
    /// No command was configured for the channel.
    EmptyCommand { channel: Channel },

    /// The OS refused to start the process.
    Spawn {
        channel: Channel,
        program: String,
        source: io::Error,
    },
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCommand { channel } => write!(
                f,
                "No {channel} command configured. Pass --{channel} or set [workers] {channel} in config.toml."
            ),
            Self::Spawn {
                channel,
                program,
                source,
            } => write!(f, "Failed to start {channel} ('{program}'): {source}"),
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<WorkerError> for LogSiftError {
    fn from(e: WorkerError) -> Self {
        Self::Worker(e)
    }
}

/// Convenience type alias for logsift results.
pub type Result<T> = std::result::Result<T, LogSiftError>;
