//! Constants for the download module (timeouts, segment fan-out).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of segments fetched at the same time.
pub const DEFAULT_SEGMENT_CONCURRENCY: usize = 4;

/// Minimum allowed segment concurrency. A value of 1 fetches strictly in order.
pub const MIN_SEGMENT_CONCURRENCY: usize = 1;

/// Maximum allowed segment concurrency.
pub const MAX_SEGMENT_CONCURRENCY: usize = 32;

/// Accepted range for timeouts, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 1;

/// Accepted range for timeouts, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 3600;
