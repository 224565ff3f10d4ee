// logsift - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Resolved platform paths for logsift configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logsift/ or %APPDATA%\logsift\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml shape
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so an older binary can read a newer file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub buffer: BufferSection,
    pub producer: ProducerSection,
    pub workers: WorkersSection,
    pub logging: LoggingSection,
}

/// `[buffer]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct BufferSection {
    /// Events held per channel while waiting for the next flush.
    pub pending_capacity: Option<usize>,
    /// Rendered lines kept per channel.
    pub committed_capacity: Option<usize>,
    /// Debounce between the first event of a burst and its flush.
    pub flush_debounce_ms: Option<u64>,
}

/// `[producer]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ProducerSection {
    /// Events retained for snapshots, across both channels.
    pub retained_lines: Option<usize>,
    /// Length at which an unterminated fragment is emitted as a line.
    pub max_partial_line_bytes: Option<usize>,
}

/// `[workers]` config section. Each entry is a program followed by its args.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct WorkersSection {
    pub agent: Option<Vec<String>>,
    pub gateway: Option<Vec<String>>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

// =============================================================================
// Validated configuration
// =============================================================================

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Buffer --
    pub pending_capacity: usize,
    pub committed_capacity: usize,
    pub flush_debounce_ms: u64,

    // -- Producer --
    pub retained_lines: usize,
    pub max_partial_line_bytes: usize,

    // -- Workers --
    pub agent_command: Vec<String>,
    pub gateway_command: Vec<String>,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pending_capacity: constants::DEFAULT_PENDING_CAPACITY,
            committed_capacity: constants::DEFAULT_COMMITTED_CAPACITY,
            flush_debounce_ms: constants::DEFAULT_FLUSH_DEBOUNCE_MS,
            retained_lines: constants::DEFAULT_RETAINED_LINES,
            max_partial_line_bytes: constants::DEFAULT_MAX_PARTIAL_LINE_BYTES,
            agent_command: Vec::new(),
            gateway_command: Vec::new(),
            log_level: None,
            log_file: None,
        }
    }
}

/// Read and parse config.toml without validating values.
pub fn read_raw_config(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate the config file at `path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing file yields defaults with no warnings (first run). An unreadable
/// or unparseable file yields defaults plus one warning.
pub fn load_config(path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let raw = match read_raw_config(path) {
        Ok(raw) => raw,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %path.display(), "Loaded config.toml");

    let (config, mut value_warnings) = validate(raw);
    warnings.append(&mut value_warnings);

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }
    (config, warnings)
}

/// Validate every field against named constants, accumulating all problems.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings = Vec::new();

    let mut apply = |result: Result<(), ConfigError>| {
        if let Err(e) = result {
            warnings.push(e.to_string());
        }
    };

    // -- Buffer --
    if let Some(v) = raw.buffer.pending_capacity {
        apply(
            check_range(
                "buffer.pending_capacity",
                v,
                1..=constants::ABSOLUTE_MAX_PENDING_CAPACITY,
                constants::DEFAULT_PENDING_CAPACITY,
            )
            .map(|v| config.pending_capacity = v),
        );
    }
    if let Some(v) = raw.buffer.committed_capacity {
        apply(
            check_range(
                "buffer.committed_capacity",
                v,
                1..=constants::ABSOLUTE_MAX_COMMITTED_CAPACITY,
                constants::DEFAULT_COMMITTED_CAPACITY,
            )
            .map(|v| config.committed_capacity = v),
        );
    }
    if let Some(v) = raw.buffer.flush_debounce_ms {
        apply(
            check_range(
                "buffer.flush_debounce_ms",
                v,
                constants::MIN_FLUSH_DEBOUNCE_MS..=constants::MAX_FLUSH_DEBOUNCE_MS,
                constants::DEFAULT_FLUSH_DEBOUNCE_MS,
            )
            .map(|v| config.flush_debounce_ms = v),
        );
    }

    // -- Producer --
    if let Some(v) = raw.producer.retained_lines {
        apply(
            check_range(
                "producer.retained_lines",
                v,
                1..=constants::ABSOLUTE_MAX_RETAINED_LINES,
                constants::DEFAULT_RETAINED_LINES,
            )
            .map(|v| config.retained_lines = v),
        );
    }
    if let Some(v) = raw.producer.max_partial_line_bytes {
        apply(
            check_range(
                "producer.max_partial_line_bytes",
                v,
                constants::MIN_MAX_PARTIAL_LINE_BYTES..=constants::ABSOLUTE_MAX_PARTIAL_LINE_BYTES,
                constants::DEFAULT_MAX_PARTIAL_LINE_BYTES,
            )
            .map(|v| config.max_partial_line_bytes = v),
        );
    }

    // -- Workers --
    if let Some(cmd) = raw.workers.agent {
        apply(check_command("workers.agent", cmd).map(|c| config.agent_command = c));
    }
    if let Some(cmd) = raw.workers.gateway {
        apply(check_command("workers.gateway", cmd).map(|c| config.gateway_command = c));
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            apply(Err(ConfigError::ValueOutOfRange {
                field: "logging.level".to_string(),
                value: level,
                expected: format!(
                    "one of error, warn, info, debug, trace. Using default ({})",
                    constants::DEFAULT_LOG_LEVEL
                ),
            }));
        }
    }

    // -- Logging: file --
    if let Some(file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file);
        }
    }

    (config, warnings)
}

fn check_range<T>(
    field: &str,
    value: T,
    range: RangeInclusive<T>,
    default: T,
) -> Result<T, ConfigError>
where
    T: PartialOrd + Display,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ValueOutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            expected: format!("{}-{}. Using default ({default})", range.start(), range.end()),
        })
    }
}

/// An empty list means "not configured"; an empty program name is an error.
fn check_command(field: &str, command: Vec<String>) -> Result<Vec<String>, ConfigError> {
    let blank_program = command.first().is_some_and(|program| program.trim().is_empty());
    if blank_program {
        return Err(ConfigError::ValueOutOfRange {
            field: field.to_string(),
            value: format!("{command:?}"),
            expected: "a program name followed by its arguments. Ignoring entry".to_string(),
        });
    }
    Ok(command)
}
