//! `DownloadError`: everything that can stop a track download or leave a
//! segment out of the output.
//!
//! Variants carry the URL or path involved, so a message is useful on its own.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while fetching a track or one of its segments.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Transport failure: DNS, refused connection, TLS, truncated body.
    #[error("network error fetching {url}: {source}")]
    Network {
        /// Source or segment URL.
        url: String,
        /// What reqwest reported.
        #[source]
        source: reqwest::Error,
    },

    /// Connect or request deadline elapsed.
    #[error("timed out fetching {url}")]
    Timeout {
        /// Source or segment URL.
        url: String,
    },

    /// Server answered with a non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// Source or segment URL.
        url: String,
        /// Status code as sent.
        status: u16,
    },

    /// Not an absolute http(s) URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected string.
        url: String,
    },

    /// File system error opening or writing the destination file.
    #[error("cannot write destination {path}: {source}")]
    Io {
        /// Destination file.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// Writing into the download sink failed.
    #[error("error writing to download sink: {source}")]
    Sink {
        /// OS or writer error.
        #[source]
        source: std::io::Error,
    },

    /// The destination already exists; downloads never overwrite.
    #[error("destination already exists: {path}")]
    DestinationExists {
        /// The resolved destination path.
        path: PathBuf,
    },

    /// A leading `~` could not be expanded because no home directory is known.
    #[error("cannot expand `~` in {path}: home directory unavailable")]
    HomeDirUnavailable {
        /// The path that contained the home marker.
        path: PathBuf,
    },

    /// Copied byte count does not match the server's Content-Length.
    #[error("integrity check failed for {url}: expected {expected_bytes} bytes, got {actual_bytes}")]
    Integrity {
        /// The URL whose body was copied.
        url: String,
        /// Content-Length sent by the server.
        expected_bytes: u64,
        /// Bytes actually copied.
        actual_bytes: u64,
    },

    /// A segment task ended without delivering a result.
    #[error("segment {index} task ended without a result")]
    TaskAborted {
        /// Manifest index of the segment.
        index: usize,
    },

    /// The download was cancelled before it finished.
    #[error("download cancelled")]
    Cancelled,

    /// A configuration value is outside its accepted range.
    #[error("invalid config value for `{field}`: {value} (expected {expected})")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// Human-readable accepted range.
        expected: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Wraps a reqwest failure; timeouts become [`Self::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Non-2xx response from `url`.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Destination open or write failure.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a sink write error.
    #[must_use]
    pub fn sink(source: std::io::Error) -> Self {
        Self::Sink { source }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a destination-exists error.
    pub fn destination_exists(path: impl Into<PathBuf>) -> Self {
        Self::DestinationExists { path: path.into() }
    }

    /// Body length disagreed with Content-Length.
    pub fn integrity(url: impl Into<String>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            url: url.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Attributes a sink write failure to the destination file at `path`.
    ///
    /// Every other variant is returned unchanged.
    #[must_use]
    pub fn at_path(self, path: &Path) -> Self {
        match self {
            Self::Sink { source } => Self::io(path, source),
            other => other,
        }
    }

    /// Returns true when the error came from the cancellation signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the URL
// or path the source error does not carry.
