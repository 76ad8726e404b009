//! Segment fan-out with a single ordered writer.
//!
//! Segments are dispatched in manifest order. The dispatch loop takes a
//! semaphore permit before spawning each fetch, and the permit travels with the
//! fetched buffer until the writer has emitted it. At most `concurrency`
//! segments are therefore in flight or waiting to be written at any time.
//!
//! The task that called [`SegmentOrchestrator::assemble`] is the only writer to
//! the sink: buffers are held until every predecessor has been handled, then
//! written strictly in manifest order.
//!
//! A failed segment never aborts the others. Its bytes are left out of the
//! output and the failure is recorded in the returned [`AssemblyReport`].
//! With a concurrency of 1 segments are fetched one at a time, in order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::constants::{MAX_SEGMENT_CONCURRENCY, MIN_SEGMENT_CONCURRENCY};
use super::error::DownloadError;
use super::fetcher::SegmentFetcher;
use super::playlist::SegmentLocator;
use super::progress::ProgressObserver;

/// A segment whose bytes are missing from the output.
#[derive(Debug)]
pub struct SegmentFailure {
    /// Manifest index of the segment.
    pub index: usize,
    /// URI that was fetched.
    pub uri: String,
    /// Why the segment is missing.
    pub error: DownloadError,
}

/// Outcome of assembling one segment list into a sink.
#[derive(Debug, Default)]
pub struct AssemblyReport {
    /// Number of segments in the manifest.
    pub segments_total: usize,
    /// Bytes written to the sink.
    pub bytes_written: u64,
    /// Segments left out of the output, in manifest order.
    pub failed: Vec<SegmentFailure>,
}

impl AssemblyReport {
    fn new(segments_total: usize) -> Self {
        Self {
            segments_total,
            ..Self::default()
        }
    }

    /// Number of segments written to the sink.
    #[must_use]
    pub fn segments_written(&self) -> usize {
        self.segments_total - self.failed.len()
    }

    /// Returns true when every segment made it into the sink.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A finished fetch on its way to the writer.
struct FetchedSegment {
    index: usize,
    result: Result<Vec<u8>, DownloadError>,
    // Released once the writer has emitted this segment.
    _permit: OwnedSemaphorePermit,
}

/// Drives segment fetches and assembles their bytes in manifest order.
#[derive(Debug, Clone)]
pub struct SegmentOrchestrator {
    fetcher: SegmentFetcher,
    concurrency: usize,
}

impl SegmentOrchestrator {
    /// Creates an orchestrator fetching up to `concurrency` segments at once.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidConfig`] if `concurrency` is outside 1..=32.
    pub fn new(fetcher: SegmentFetcher, concurrency: usize) -> Result<Self, DownloadError> {
        if !(MIN_SEGMENT_CONCURRENCY..=MAX_SEGMENT_CONCURRENCY).contains(&concurrency) {
            return Err(DownloadError::InvalidConfig {
                field: "segment_concurrency",
                value: u64::try_from(concurrency).unwrap_or(u64::MAX),
                expected: "1..=32",
            });
        }
        Ok(Self {
            fetcher,
            concurrency,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fetches every segment and writes the results to `sink` in order.
    ///
    /// Returns only after every segment has been attempted. `progress` is
    /// advanced as each segment is written, so bytes of failed segments are
    /// never counted.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Cancelled`] if the fetcher's token fires and
    /// [`DownloadError::Sink`] if the sink rejects a write. Segment failures
    /// are not errors; they are listed in the report.
    #[instrument(skip_all, fields(segments = segments.len(), concurrency = self.concurrency))]
    pub async fn assemble<W>(
        &self,
        segments: &[SegmentLocator],
        sink: &mut W,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<AssemblyReport, DownloadError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if segments.is_empty() {
            return Ok(AssemblyReport::new(0));
        }

        // Every outstanding message holds a permit, so this never fills up.
        let (tx, rx) = mpsc::channel(self.concurrency);
        let writer = OrderedWriter::new(segments, sink, progress);

        // An error from either side drops the other, which aborts in-flight fetches.
        let ((), report) = tokio::try_join!(self.dispatch(segments, tx), writer.drain(rx))?;
        Ok(report)
    }

    /// Spawns one fetch per segment, in manifest order, as permits free up.
    async fn dispatch(
        &self,
        segments: &[SegmentLocator],
        tx: mpsc::Sender<FetchedSegment>,
    ) -> Result<(), DownloadError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        // Dropping the set aborts every fetch still running.
        let mut tasks = JoinSet::new();

        for segment in segments {
            let permit = tokio::select! {
                biased;
                () = self.fetcher.cancel_token().cancelled() => return Err(DownloadError::Cancelled),
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|_| DownloadError::TaskAborted { index: segment.index })?
                }
            };

            let fetcher = self.fetcher.clone();
            let tx = tx.clone();
            let index = segment.index;
            let uri = segment.uri.clone();

            tasks.spawn(async move {
                let result = fetcher.fetch_to_vec(&uri, None).await;
                // Receiver only goes away when assembly already bailed out.
                let _ = tx
                    .send(FetchedSegment {
                        index,
                        result,
                        _permit: permit,
                    })
                    .await;
            });
            debug!(index, "segment dispatched");
        }
        drop(tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "segment task panicked");
            }
        }
        Ok(())
    }
}

/// Owns every write to the sink and emits buffers in manifest order.
struct OrderedWriter<'a, W: ?Sized> {
    segments: &'a [SegmentLocator],
    sink: &'a mut W,
    progress: Option<&'a dyn ProgressObserver>,
    pending: BTreeMap<usize, FetchedSegment>,
    next: usize,
    report: AssemblyReport,
}

impl<'a, W> OrderedWriter<'a, W>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    fn new(
        segments: &'a [SegmentLocator],
        sink: &'a mut W,
        progress: Option<&'a dyn ProgressObserver>,
    ) -> Self {
        Self {
            segments,
            sink,
            progress,
            pending: BTreeMap::new(),
            next: 0,
            report: AssemblyReport::new(segments.len()),
        }
    }

    /// Writes fetched segments as they arrive until every sender is gone.
    async fn drain(
        mut self,
        mut rx: mpsc::Receiver<FetchedSegment>,
    ) -> Result<AssemblyReport, DownloadError> {
        while let Some(fetched) = rx.recv().await {
            if matches!(fetched.result, Err(DownloadError::Cancelled)) {
                info!(index = fetched.index, "segment fetch cancelled; aborting assembly");
                return Err(DownloadError::Cancelled);
            }
            self.accept(fetched).await?;
        }
        self.finish().await
    }

    /// Stores one result and flushes every buffer that is now in order.
    async fn accept(&mut self, fetched: FetchedSegment) -> Result<(), DownloadError> {
        self.pending.insert(fetched.index, fetched);
        while let Some(fetched) = self.pending.remove(&self.next) {
            self.emit(fetched.result).await?;
        }
        Ok(())
    }

    /// Handles the segment at `self.next` and advances the cursor.
    async fn emit(&mut self, result: Result<Vec<u8>, DownloadError>) -> Result<(), DownloadError> {
        let index = self.next;
        match result {
            Ok(bytes) => {
                self.sink
                    .write_all(&bytes)
                    .await
                    .map_err(DownloadError::sink)?;
                let len = bytes.len() as u64;
                self.report.bytes_written += len;
                if let Some(progress) = self.progress {
                    progress.advance(len);
                }
                debug!(index, bytes = len, "segment written");
            }
            Err(error) => {
                let uri = self
                    .segments
                    .get(index)
                    .map(|segment| segment.uri.clone())
                    .unwrap_or_default();
                warn!(index, uri = %uri, error = %error, "segment failed; output will have a gap");
                self.report.failed.push(SegmentFailure { index, uri, error });
            }
        }
        self.next += 1;
        Ok(())
    }

    /// Accounts for segments whose task never reported, then flushes the sink.
    async fn finish(mut self) -> Result<AssemblyReport, DownloadError> {
        while self.next < self.segments.len() {
            let index = self.next;
            let result = match self.pending.remove(&index) {
                Some(fetched) => fetched.result,
                None => Err(DownloadError::TaskAborted { index }),
            };
            self.emit(result).await?;
        }

        self.sink.flush().await.map_err(DownloadError::sink)?;

        info!(
            segments = self.report.segments_total,
            failed = self.report.failed.len(),
            bytes = self.report.bytes_written,
            "segment assembly complete"
        );
        Ok(self.report)
    }
}
