//! Track download pipeline.
//!
//! This module fetches a track identified by URL. Progressive files are
//! streamed straight to the destination; HLS media playlists are decoded,
//! their segments fetched concurrently, and the bytes written in manifest
//! order into a single file or buffer.
//!
//! # Features
//!
//! - Streaming copies (a progressive file is never held in memory)
//! - Bounded segment fan-out with a single ordered writer
//! - Per-request timeouts (30s connect, 5min read by default)
//! - One cancellation token per downloader
//! - Per-segment failures reported instead of swallowed
//! - Never overwrites an existing destination
//!
//! # Example
//!
//! ```no_run
//! use trackfetch::download::{DownloadRequest, Downloader, Quality};
//! use trackfetch::DownloadConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(DownloadConfig::default())?;
//! let request = DownloadRequest::new("https://cdn.example.com/a.m3u8", "Track", Quality::Other("hq".into()), "mp3");
//! let mut buffer = Vec::new();
//! let report = downloader.download_to_buffer(&request, &mut buffer).await?;
//! println!("{} bytes, missing segments: {:?}", buffer.len(), report.failed_indices());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod coordinator;
mod destination;
mod error;
mod fetcher;
mod orchestrator;
mod playlist;
mod progress;
mod request;

pub use client::HttpClient;
pub use coordinator::{DownloadKind, DownloadReport, DownloadStatus, Downloader};
pub use destination::{expand_home, resolve_destination};
pub use error::DownloadError;
pub use fetcher::SegmentFetcher;
pub use orchestrator::{AssemblyReport, SegmentFailure, SegmentOrchestrator};
pub use playlist::{SegmentLocator, parse_segments};
pub use progress::ProgressObserver;
pub use request::{DownloadRequest, Quality};

// No module-local Result alias: signatures spell out `Result<T, DownloadError>`.
