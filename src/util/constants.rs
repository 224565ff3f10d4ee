// logsift - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every growing collection in the pipeline is bounded by one of these.

use std::time::Duration;

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "logsift";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "logsift";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Channel buffer limits
// =============================================================================

/// Maximum number of events waiting in a channel's pending batch.
/// Appends beyond this evict the oldest pending events.
pub const DEFAULT_PENDING_CAPACITY: usize = 5_000;

/// Hard upper bound on the configurable pending capacity.
pub const ABSOLUTE_MAX_PENDING_CAPACITY: usize = 50_000;

/// Maximum number of committed (rendered) lines kept per channel.
pub const DEFAULT_COMMITTED_CAPACITY: usize = 2_000;

/// Hard upper bound on the configurable committed capacity.
pub const ABSOLUTE_MAX_COMMITTED_CAPACITY: usize = 20_000;

/// Delay between the first event of a burst and the flush that commits it.
pub const DEFAULT_FLUSH_DEBOUNCE_MS: u64 = 200;

/// Minimum user-configurable flush debounce (ms).
pub const MIN_FLUSH_DEBOUNCE_MS: u64 = 10;

/// Maximum user-configurable flush debounce (ms).
pub const MAX_FLUSH_DEBOUNCE_MS: u64 = 5_000;

/// Maximum number of subscription events drained by a single pipeline pump.
/// Remaining events stay queued for the next pump so a burst cannot stall
/// the render loop.
pub const MAX_EVENTS_PER_PUMP: usize = 1_000;

/// Upper bound on how long the watch loop sleeps between pumps.
pub const PUMP_IDLE_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// Producer limits
// =============================================================================

/// Number of events the producer-side store retains for snapshots,
/// across both channels.
pub const DEFAULT_RETAINED_LINES: usize = 2_000;

/// Hard upper bound on the configurable retained line count.
pub const ABSOLUTE_MAX_RETAINED_LINES: usize = 20_000;

/// Size of a single read from a worker pipe.
pub const READ_CHUNK_BYTES: usize = 4 * 1_024;

/// Length at which an unterminated line fragment is emitted as-is.
/// Guards against unbounded growth when a worker writes no newlines.
pub const DEFAULT_MAX_PARTIAL_LINE_BYTES: usize = 2_048;

/// Minimum user-configurable partial line length.
pub const MIN_MAX_PARTIAL_LINE_BYTES: usize = 256;

/// Maximum user-configurable partial line length.
pub const ABSOLUTE_MAX_PARTIAL_LINE_BYTES: usize = 1_024 * 1_024;

/// Environment applied to every worker process so its output arrives line by
/// line and in UTF-8.
pub const WORKER_ENV: [(&str, &str); 3] = [
    ("PYTHONUNBUFFERED", "1"),
    ("PYTHONIOENCODING", "utf-8"),
    ("PYTHONUTF8", "1"),
];

/// Line emitted on stderr when a worker stream reaches EOF.
pub const STREAM_CLOSED_MESSAGE: &str = "Process exited or stream closed";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of worker or chat text echoed into debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
