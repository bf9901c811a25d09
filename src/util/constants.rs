//! Application-wide constants for fieldlog.
//!
//! Centralising magic numbers and configuration defaults here keeps the rest
//! of the codebase clean and makes tuning straightforward.

/// Field separator used in log lines when none is configured.
pub const DEFAULT_SEPARATOR: char = ';';

/// Character whose presence marks a line as carrying a time-of-day.
/// Used as the cheap validity probe before splitting a line.
pub const TIMESTAMP_MARKER: char = ':';

/// Seconds in one calendar day; the step of the stepped day walk.
pub const SECS_PER_DAY: i64 = 86_400;

/// Largest payload the transport accepts, in bytes.
/// Matches the buffer size the broker client is configured with.
pub const MAX_PAYLOAD_BYTES: usize = 34_464;

/// Read buffer per open file. Kept small: only one file is open at a time
/// and a line is pulled out of it before the next refill.
pub const READ_BUFFER_BYTES: usize = 512;

/// Default number of lines per published page.
/// 120 lines of typical sensor readings stay well below [`MAX_PAYLOAD_BYTES`].
pub const DEFAULT_PAGE_LENGTH: usize = 120;

/// Default daily file prefix.
pub const DEFAULT_FILE_PREFIX: &str = "log";

/// Default daily file type (without the leading dot).
pub const DEFAULT_FILETYPE: &str = "csv";

/// Application prefix for published topics.
pub const DEFAULT_TOPIC_PREFIX: &str = "datagator";

/// Device identifier used when none is configured.
pub const DEFAULT_DEVICE_ID: &str = "node-0";

/// Topic segment between the application prefix and the device id for
/// republished time-range pages.
pub const TIME_RANGE_TOPIC: &str = "data/time_range";

/// Maximum number of publish attempts per page before it is dropped.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay in milliseconds for exponential backoff between publish attempts.
/// Sequence: 50ms -> 100ms -> 200ms.
pub const RETRY_BASE_DELAY_MS: u64 = 50;

/// Capacity of the queue between the scanner and the transport thread.
/// Small on purpose: each slot holds a full page.
pub const TRANSPORT_QUEUE_BOUND: usize = 4;

/// Application display name used in log output.
pub const APP_NAME: &str = "fieldlog";

/// Application version string.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "fieldlog.json";

/// Log file name for persistent error/debug logging.
pub const LOG_FILE_NAME: &str = "fieldlog.log";

/// Maximum log file size in bytes before rotation (5 MB).
pub const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;
