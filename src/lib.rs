//! trackfetch
//!
//! Downloads audio tracks by URL. A track delivered as a single file is
//! streamed to disk; a track delivered as an HLS media playlist has its
//! segments fetched and concatenated, in manifest order, into one file or
//! an in-memory buffer.
//!
//! # Architecture
//!
//! - [`download`] - playlist parsing, segment fetching, ordered assembly and
//!   the [`Downloader`] that ties them together
//! - [`config`] - timeouts and fan-out width for a downloader

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use config::DownloadConfig;
pub use download::{
    DownloadError, DownloadKind, DownloadReport, DownloadRequest, DownloadStatus, Downloader,
    HttpClient, ProgressObserver, Quality, SegmentFailure, SegmentLocator, parse_segments,
};
