//! HTTP access for the source URL and every segment.
//!
//! [`HttpClient`] issues plain GETs with the configured deadlines.
//! `stream_body` copies a response into any async sink chunk by chunk.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument, trace};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::progress::ProgressObserver;
use crate::config::DownloadConfig;
use crate::user_agent;

/// HTTP client scoped to one [`Downloader`](crate::Downloader).
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Client with the default deadlines (connect 30 s, request 300 s).
    ///
    /// # Panics
    ///
    /// Panics if reqwest cannot build a client from the built-in settings,
    /// e.g. when no TLS backend can be initialised.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = build_client(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
            .expect("built-in HTTP client settings are valid");
        Self { client }
    }

    /// Creates a client with the timeouts from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if reqwest rejects the configuration.
    pub fn from_config(config: &DownloadConfig) -> Result<Self, DownloadError> {
        let client = build_client(config.connect_timeout_secs, config.read_timeout_secs)
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Issues a GET request and returns the response once headers arrive.
    ///
    /// # Errors
    ///
    /// [`DownloadError::InvalidUrl`] for unparseable URLs, `Network` or
    /// `Timeout` when the request fails, and `HttpStatus` for non-2xx replies.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        debug!(status = status.as_u16(), content_length = ?response.content_length(), "response received");
        Ok(response)
    }
}

/// Streams a response body into `sink`, returning the number of bytes written.
///
/// Each chunk is written to the sink and then reported to `progress`, so the
/// whole body is never held in memory by this function.
pub(crate) async fn stream_body<W>(
    response: reqwest::Response,
    url: &str,
    sink: &mut W,
    progress: Option<&dyn ProgressObserver>,
) -> Result<u64, DownloadError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut body = response.bytes_stream();
    let mut copied: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| DownloadError::network(url, e))?;

        sink.write_all(&chunk).await.map_err(DownloadError::sink)?;

        let len = chunk.len() as u64;
        copied += len;
        if let Some(progress) = progress {
            progress.advance(len);
        }
        trace!(chunk_bytes = len, total = copied, "chunk written");
    }

    sink.flush().await.map_err(DownloadError::sink)?;

    Ok(copied)
}

fn build_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_download_user_agent())
        .build()
}
