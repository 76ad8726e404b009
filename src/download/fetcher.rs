//! Single-resource fetching with cancellation.
//!
//! A [`SegmentFetcher`] issues exactly one GET per call and copies the body
//! into the given sink. Every failure is returned to the caller; nothing is
//! retried and nothing is swallowed here.

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::client::{HttpClient, stream_body};
use super::error::DownloadError;
use super::progress::ProgressObserver;

/// Fetches one URI at a time into a sink.
///
/// Clones share the HTTP client and the cancellation token.
#[derive(Debug, Clone)]
pub struct SegmentFetcher {
    client: HttpClient,
    cancel: CancellationToken,
}

impl SegmentFetcher {
    /// Creates a fetcher using `client`, stopped by `cancel`.
    #[must_use]
    pub fn new(client: HttpClient, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Returns the cancellation token shared by this fetcher.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Issues the GET for `uri` and returns the response once headers arrive.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Cancelled`] if the token fires first, otherwise
    /// any error from [`HttpClient::get`].
    pub async fn open(&self, uri: &str) -> Result<reqwest::Response, DownloadError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(DownloadError::Cancelled),
            result = self.client.get(uri) => result,
        }
    }

    /// Fetches `uri` and appends its whole body to `sink`.
    ///
    /// Bytes are tee'd into `progress` as they stream. Returns the number of
    /// bytes written. On error the sink may already hold a prefix of the body.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Cancelled`] if the token fires, or the network,
    /// status or sink error that stopped the copy.
    #[instrument(level = "debug", skip(self, sink, progress), fields(uri = %uri))]
    pub async fn fetch_into<W>(
        &self,
        uri: &str,
        sink: &mut W,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<u64, DownloadError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let copy = async {
            let response = self.client.get(uri).await?;
            stream_body(response, uri, sink, progress).await
        };

        let bytes = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(DownloadError::Cancelled),
            result = copy => result?,
        };

        debug!(bytes, "fetch complete");
        Ok(bytes)
    }

    /// Fetches `uri` into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_into`](Self::fetch_into).
    pub async fn fetch_to_vec(
        &self,
        uri: &str,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<Vec<u8>, DownloadError> {
        let mut buffer = Vec::new();
        self.fetch_into(uri, &mut buffer, progress).await?;
        Ok(buffer)
    }
}
