//! Download coordinator: one request in, one file (or buffer) out.
//!
//! # Flow
//!
//! `resolve destination -> GET source -> { parse manifest + fan out | direct copy } -> report`
//!
//! The `low` quality tier is a progressive file and is streamed straight into
//! the sink. Every other tier is an HLS media playlist whose segments are
//! assembled by the [`SegmentOrchestrator`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use trackfetch::{DownloadConfig, DownloadRequest, Downloader, Quality};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(DownloadConfig::default())?;
//! let request = DownloadRequest::new(
//!     "https://cdn.example.com/track/playlist.m3u8",
//!     "Night Drive",
//!     Quality::Other("hq".to_string()),
//!     "mp3",
//! );
//! let report = downloader.download_to_dir(&request, Path::new("~/Music"), None).await?;
//! println!("{:?}: {:?}", report.status(), report.path);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::{HttpClient, stream_body};
use super::destination::resolve_destination;
use super::error::DownloadError;
use super::fetcher::SegmentFetcher;
use super::orchestrator::{AssemblyReport, SegmentFailure, SegmentOrchestrator};
use super::playlist::{SegmentLocator, parse_segments};
use super::progress::ProgressObserver;
use super::request::DownloadRequest;
use crate::config::DownloadConfig;

/// How the track was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    /// Single progressive file copied as-is.
    Direct,
    /// HLS media playlist assembled from segments.
    Hls,
}

/// Download-level outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Every byte (or every segment) was written.
    Complete,
    /// The manifest listed no segments; nothing was written.
    Empty,
    /// Some segments are missing from the output.
    Partial,
    /// The manifest listed segments and every one of them failed.
    Failed,
}

/// Result of one download.
#[derive(Debug)]
pub struct DownloadReport {
    /// Destination file for disk downloads that produced one.
    pub path: Option<PathBuf>,
    /// Direct copy or HLS assembly.
    pub kind: DownloadKind,
    /// Bytes written to the sink.
    pub bytes_written: u64,
    /// Segments listed in the manifest (0 for direct downloads).
    pub segments_total: usize,
    /// Segments missing from the output, in manifest order.
    pub failed_segments: Vec<SegmentFailure>,
}

impl DownloadReport {
    /// Classifies the outcome.
    #[must_use]
    pub fn status(&self) -> DownloadStatus {
        if self.kind == DownloadKind::Hls && self.segments_total == 0 {
            DownloadStatus::Empty
        } else if self.failed_segments.is_empty() {
            DownloadStatus::Complete
        } else if self.failed_segments.len() == self.segments_total {
            DownloadStatus::Failed
        } else {
            DownloadStatus::Partial
        }
    }

    /// Manifest indices of the segments missing from the output.
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed_segments.iter().map(|f| f.index).collect()
    }
}

/// Downloads tracks, either to disk or into memory.
///
/// Each downloader owns its HTTP client (with the configured timeouts) and a
/// cancellation token shared by every request it makes.
#[derive(Debug, Clone)]
pub struct Downloader {
    config: DownloadConfig,
    fetcher: SegmentFetcher,
    orchestrator: SegmentOrchestrator,
}

impl Downloader {
    /// Creates a downloader from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidConfig`] for out-of-range values or
    /// [`DownloadError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Creates a downloader stopped by `cancel`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    #[instrument(level = "debug", skip(cancel))]
    pub fn with_cancellation(
        config: DownloadConfig,
        cancel: CancellationToken,
    ) -> Result<Self, DownloadError> {
        config.validate()?;
        let client = HttpClient::from_config(&config)?;
        let fetcher = SegmentFetcher::new(client, cancel);
        let orchestrator = SegmentOrchestrator::new(fetcher.clone(), config.segment_concurrency)?;
        Ok(Self {
            config,
            fetcher,
            orchestrator,
        })
    }

    /// Returns the configuration this downloader was built with.
    #[must_use]
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Returns the token that cancels every download of this downloader.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        self.fetcher.cancel_token()
    }

    /// Resolves where `request` would be saved under `base_dir`.
    ///
    /// # Errors
    ///
    /// See [`resolve_destination`].
    pub fn resolve_destination(
        &self,
        request: &DownloadRequest,
        base_dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        resolve_destination(base_dir, request)
    }

    /// Downloads `request` into `base_dir`, never overwriting an existing file.
    ///
    /// `progress` is started with the expected size (direct downloads with a
    /// Content-Length) or `None` (HLS), advanced as bytes reach the file, and
    /// finished once writing stops, whether or not it succeeded.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the destination exists, the source request
    /// fails, the destination cannot be written, or the download is cancelled.
    /// Segment failures are reported in [`DownloadReport::failed_segments`].
    #[instrument(skip(self, request, progress), fields(url = %request.source_url(), quality = %request.quality()))]
    pub async fn download_to_dir(
        &self,
        request: &DownloadRequest,
        base_dir: &Path,
        progress: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<DownloadReport, DownloadError> {
        let path = resolve_destination(base_dir, request)?;
        info!(path = %path.display(), "starting download");

        let url = request.source_url();
        let response = self.fetcher.open(url).await?;

        let report = if request.quality().is_hls() {
            self.save_hls(response, url, &path, progress.as_deref())
                .await?
        } else {
            self.save_direct(response, url, &path, progress.as_deref())
                .await?
        };

        log_report(&report);
        Ok(report)
    }

    /// Downloads `request` into `buffer`, appending to whatever it holds.
    ///
    /// No destination path is resolved and no progress is reported.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the source request fails or the download is
    /// cancelled. Segment failures are reported in the returned report.
    #[instrument(skip(self, request, buffer), fields(url = %request.source_url(), quality = %request.quality()))]
    pub async fn download_to_buffer(
        &self,
        request: &DownloadRequest,
        buffer: &mut Vec<u8>,
    ) -> Result<DownloadReport, DownloadError> {
        let url = request.source_url();
        let response = self.fetcher.open(url).await?;

        let report = if request.quality().is_hls() {
            let segments = self.manifest_segments(response, url).await?;
            if segments.is_empty() {
                info!("manifest lists no segments; nothing to do");
                return Ok(empty_hls_report());
            }

            let assembled = self.orchestrator.assemble(&segments, buffer, None).await?;
            hls_report(None, assembled)
        } else {
            let bytes_written = self.copy_direct(response, url, buffer, None).await?;
            direct_report(None, bytes_written)
        };

        log_report(&report);
        Ok(report)
    }

    /// Assembles the manifest in `response` into a new file at `path`.
    async fn save_hls(
        &self,
        response: reqwest::Response,
        url: &str,
        path: &Path,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<DownloadReport, DownloadError> {
        let segments = self.manifest_segments(response, url).await?;
        if segments.is_empty() {
            info!("manifest lists no segments; nothing to do");
            return Ok(empty_hls_report());
        }

        let mut file = open_destination(path, true).await?;
        let assembled = observed(
            progress,
            None,
            self.write_segments(&segments, &mut file, path, progress),
        )
        .await;
        let assembled = match assembled {
            Ok(assembled) => assembled,
            Err(e) => {
                discard_if_empty(path).await;
                return Err(e);
            }
        };

        // Every segment failed: leave no empty file blocking a later attempt.
        let path = if assembled.bytes_written == 0 {
            discard_if_empty(path).await;
            None
        } else {
            Some(path.to_path_buf())
        };
        Ok(hls_report(path, assembled))
    }

    /// Streams the progressive file in `response` into a new file at `path`.
    async fn save_direct(
        &self,
        response: reqwest::Response,
        url: &str,
        path: &Path,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<DownloadReport, DownloadError> {
        let file = open_destination(path, false).await?;
        let mut writer = BufWriter::new(file);
        let total = response.content_length();
        let copied = observed(
            progress,
            total,
            self.write_direct(response, url, &mut writer, path, progress),
        )
        .await;

        match copied {
            Ok(bytes_written) => Ok(direct_report(Some(path.to_path_buf()), bytes_written)),
            Err(e) => {
                discard_if_empty(path).await;
                Err(e)
            }
        }
    }

    /// Runs the orchestrator against the destination sink at `path`.
    async fn write_segments<W>(
        &self,
        segments: &[SegmentLocator],
        sink: &mut W,
        path: &Path,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<AssemblyReport, DownloadError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.orchestrator
            .assemble(segments, sink, progress)
            .await
            .map_err(|e| e.at_path(path))
    }

    /// Copies a progressive file into the destination sink at `path`.
    async fn write_direct<W>(
        &self,
        response: reqwest::Response,
        url: &str,
        sink: &mut W,
        path: &Path,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<u64, DownloadError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.copy_direct(response, url, sink, progress)
            .await
            .map_err(|e| e.at_path(path))
    }

    /// Reads a manifest body, honouring cancellation, and decodes its segments.
    async fn manifest_segments(
        &self,
        response: reqwest::Response,
        url: &str,
    ) -> Result<Vec<SegmentLocator>, DownloadError> {
        let base_url = response.url().clone();
        let body = tokio::select! {
            biased;
            () = self.cancel_token().cancelled() => return Err(DownloadError::Cancelled),
            body = response.bytes() => body.map_err(|e| DownloadError::network(url, e))?,
        };
        debug!(bytes = body.len(), "manifest received");
        Ok(parse_segments(&body, Some(&base_url)))
    }

    /// Streams a progressive file into `sink` and checks it against Content-Length.
    async fn copy_direct<W>(
        &self,
        response: reqwest::Response,
        url: &str,
        sink: &mut W,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<u64, DownloadError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let expected = response.content_length();
        let bytes = tokio::select! {
            biased;
            () = self.cancel_token().cancelled() => return Err(DownloadError::Cancelled),
            copied = stream_body(response, url, sink, progress) => copied?,
        };
        verify_length(url, expected, bytes)
    }
}

/// Starts `progress`, runs `work`, and finishes `progress` on every outcome.
async fn observed<T>(
    progress: Option<&dyn ProgressObserver>,
    total: Option<u64>,
    work: impl Future<Output = Result<T, DownloadError>>,
) -> Result<T, DownloadError> {
    if let Some(progress) = progress {
        progress.start(total);
    }
    let result = work.await;
    if let Some(progress) = progress {
        progress.finish();
    }
    result
}

/// Fails when the server announced a length and a different number of bytes arrived.
fn verify_length(url: &str, expected: Option<u64>, actual: u64) -> Result<u64, DownloadError> {
    match expected {
        Some(expected) if expected != actual => {
            Err(DownloadError::integrity(url, expected, actual))
        }
        _ => Ok(actual),
    }
}

/// Opens the destination without ever replacing an existing file.
async fn open_destination(path: &Path, append: bool) -> Result<File, DownloadError> {
    let mut options = OpenOptions::new();
    options.create_new(true);
    if append {
        options.append(true);
    } else {
        options.write(true);
    }

    options.open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            DownloadError::destination_exists(path)
        } else {
            DownloadError::io(path, e)
        }
    })
}

/// Removes a destination this download created but never wrote to.
async fn discard_if_empty(path: &Path) {
    let is_empty = tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.len() == 0);
    if is_empty {
        debug!(path = %path.display(), "removing empty destination after error");
        let _ = tokio::fs::remove_file(path).await;
    }
}

fn empty_hls_report() -> DownloadReport {
    hls_report(None, AssemblyReport::default())
}

fn hls_report(path: Option<PathBuf>, assembled: AssemblyReport) -> DownloadReport {
    DownloadReport {
        path,
        kind: DownloadKind::Hls,
        bytes_written: assembled.bytes_written,
        segments_total: assembled.segments_total,
        failed_segments: assembled.failed,
    }
}

fn direct_report(path: Option<PathBuf>, bytes_written: u64) -> DownloadReport {
    DownloadReport {
        path,
        kind: DownloadKind::Direct,
        bytes_written,
        segments_total: 0,
        failed_segments: Vec::new(),
    }
}

fn log_report(report: &DownloadReport) {
    match report.status() {
        DownloadStatus::Complete | DownloadStatus::Empty => info!(
            status = ?report.status(),
            bytes = report.bytes_written,
            segments = report.segments_total,
            "download complete"
        ),
        DownloadStatus::Partial | DownloadStatus::Failed => warn!(
            status = ?report.status(),
            bytes = report.bytes_written,
            segments = report.segments_total,
            failed = ?report.failed_indices(),
            "download finished with missing segments"
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    /// Sink whose every write fails.
    struct BrokenSink;

    impl AsyncWrite for BrokenSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::other("disk full")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[derive(Default)]
    struct CallLog(Mutex<Vec<&'static str>>);

    impl ProgressObserver for CallLog {
        fn start(&self, _total: Option<u64>) {
            self.0.lock().unwrap().push("start");
        }

        fn advance(&self, _bytes: u64) {
            self.0.lock().unwrap().push("advance");
        }

        fn finish(&self) {
            self.0.lock().unwrap().push("finish");
        }
    }

    fn downloader() -> Downloader {
        Downloader::new(DownloadConfig::default()).unwrap()
    }

    fn report(kind: DownloadKind, total: usize, failed: &[usize]) -> DownloadReport {
        DownloadReport {
            path: None,
            kind,
            bytes_written: 0,
            segments_total: total,
            failed_segments: failed
                .iter()
                .map(|&index| SegmentFailure {
                    index,
                    uri: format!("https://cdn.example.com/{index}.ts"),
                    error: DownloadError::http_status("https://cdn.example.com", 500),
                })
                .collect(),
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            report(DownloadKind::Direct, 0, &[]).status(),
            DownloadStatus::Complete
        );
        assert_eq!(
            report(DownloadKind::Hls, 0, &[]).status(),
            DownloadStatus::Empty
        );
        assert_eq!(
            report(DownloadKind::Hls, 3, &[]).status(),
            DownloadStatus::Complete
        );
        assert_eq!(
            report(DownloadKind::Hls, 3, &[1]).status(),
            DownloadStatus::Partial
        );
        assert_eq!(
            report(DownloadKind::Hls, 2, &[0, 1]).status(),
            DownloadStatus::Failed
        );
    }

    #[test]
    fn test_failed_indices_in_manifest_order() {
        assert_eq!(
            report(DownloadKind::Hls, 5, &[1, 3]).failed_indices(),
            vec![1, 3]
        );
    }

    #[test]
    fn test_downloader_rejects_invalid_config() {
        let config = DownloadConfig::default().with_segment_concurrency(0);
        assert!(matches!(
            Downloader::new(config),
            Err(DownloadError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_destination_never_overwrites() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("taken.mp3");
        std::fs::write(&path, b"keep me").unwrap();

        for append in [true, false] {
            let result = open_destination(&path, append).await;
            assert!(matches!(
                result,
                Err(DownloadError::DestinationExists { .. })
            ));
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_verify_length_accepts_matching_or_unknown_length() {
        assert_eq!(verify_length("https://cdn.example.com/a.mp3", Some(5), 5).unwrap(), 5);
        assert_eq!(verify_length("https://cdn.example.com/a.mp3", None, 7).unwrap(), 7);
    }

    #[test]
    fn test_verify_length_rejects_short_body() {
        let result = verify_length("https://cdn.example.com/a.mp3", Some(10), 5);
        assert!(matches!(
            result,
            Err(DownloadError::Integrity {
                expected_bytes: 10,
                actual_bytes: 5,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_observed_finishes_progress_on_error() {
        let calls = CallLog::default();
        let log: &dyn ProgressObserver = &calls;
        let result: Result<(), DownloadError> =
            observed(Some(log), Some(3), async { Err(DownloadError::Cancelled) }).await;

        assert!(matches!(result, Err(DownloadError::Cancelled)));
        assert_eq!(*calls.0.lock().unwrap(), vec!["start", "finish"]);
    }

    #[tokio::test]
    async fn test_segment_write_failure_names_destination() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/0.ts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .mount(&server)
            .await;

        let segments = vec![SegmentLocator {
            index: 0,
            uri: format!("{}/0.ts", server.uri()),
        }];
        let destination = Path::new("/music/Night Drive[hq].mp3");
        let result = downloader()
            .write_segments(&segments, &mut BrokenSink, destination, None)
            .await;

        match result {
            Err(DownloadError::Io { path, .. }) => assert_eq!(path, destination),
            other => panic!("Expected Io error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_direct_write_failure_names_destination() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/track.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"progressive".to_vec()))
            .mount(&server)
            .await;

        let downloader = downloader();
        let url = format!("{}/track.mp3", server.uri());
        let response = downloader.fetcher.open(&url).await.unwrap();
        let destination = Path::new("/music/Night Drive[low].mp3");
        let result = downloader
            .write_direct(response, &url, &mut BrokenSink, destination, None)
            .await;

        match result {
            Err(DownloadError::Io { path, .. }) => assert_eq!(path, destination),
            other => panic!("Expected Io error, got: {other:?}"),
        }
    }
}
