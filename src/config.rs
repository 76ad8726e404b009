//! Runtime configuration for a [`Downloader`](crate::Downloader).

use crate::download::DownloadError;
use crate::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_SEGMENT_CONCURRENCY, MAX_SEGMENT_CONCURRENCY, MAX_TIMEOUT_SECS,
    MIN_SEGMENT_CONCURRENCY, MIN_TIMEOUT_SECS, READ_TIMEOUT_SECS,
};

/// Timeouts and fan-out width used for one downloader.
///
/// Every HTTP request made on behalf of a download (the primary resource and
/// each segment) uses these timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Connect timeout in seconds (1..=3600).
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds (1..=3600).
    pub read_timeout_secs: u64,
    /// Number of segments fetched at the same time (1..=32).
    pub segment_concurrency: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            segment_concurrency: DEFAULT_SEGMENT_CONCURRENCY,
        }
    }
}

impl DownloadConfig {
    /// Returns a copy with a different segment concurrency.
    #[must_use]
    pub fn with_segment_concurrency(mut self, segment_concurrency: usize) -> Self {
        self.segment_concurrency = segment_concurrency;
        self
    }

    /// Returns a copy with different timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        self.connect_timeout_secs = connect_timeout_secs;
        self.read_timeout_secs = read_timeout_secs;
        self
    }

    /// Validates every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidConfig`] naming the first field out of range.
    pub fn validate(&self) -> Result<(), DownloadError> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if !(MIN_SEGMENT_CONCURRENCY..=MAX_SEGMENT_CONCURRENCY).contains(&self.segment_concurrency)
        {
            return Err(DownloadError::InvalidConfig {
                field: "segment_concurrency",
                value: u64::try_from(self.segment_concurrency).unwrap_or(u64::MAX),
                expected: "1..=32",
            });
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), DownloadError> {
    if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&value) {
        return Err(DownloadError::InvalidConfig {
            field,
            value,
            expected: "1..=3600",
        });
    }
    Ok(())
}
