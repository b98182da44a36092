//! Streaming catalog download and decompression
//!
//! The response body is consumed as a stream and fed through the gzip
//! decoder chunk by chunk, so decompression begins before the download
//! completes. Only the decompressed output is materialized in full, because
//! the catalog format has to be parsed as a whole.

use async_compression::tokio::bufread::GzipDecoder;
use futures::TryStreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;
use tracing::info;

use super::error::RefreshError;

/// Downloads the gzip-compressed instrument catalog from a fixed URL
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    client: Client,
    url: String,
}

impl CatalogFetcher {
    /// Create a fetcher with a total request timeout.
    ///
    /// Timeout expiry during the download surfaces as
    /// [`RefreshError::Network`].
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }

    /// Catalog URL this fetcher targets
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Stream the catalog and return the fully decompressed payload.
    ///
    /// No retries here; retry policy belongs to the refresh scheduler.
    pub async fn download(&self) -> Result<Vec<u8>, RefreshError> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let compressed_len = response.content_length().unwrap_or(0);

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let mut decoder = GzipDecoder::new(StreamReader::new(stream));

        let mut payload = Vec::new();
        decoder
            .read_to_end(&mut payload)
            .await
            .map_err(classify_stream_error)?;

        info!(
            "Downloaded catalog: {} compressed bytes -> {} decompressed in {:?}",
            compressed_len,
            payload.len(),
            start.elapsed()
        );

        Ok(payload)
    }
}

/// An error whose source is the HTTP stream is a network failure even when
/// the decoder reports it; anything else is corrupt or truncated gzip.
fn classify_stream_error(err: std::io::Error) -> RefreshError {
    match err.downcast::<reqwest::Error>() {
        Ok(network) => RefreshError::Network(network),
        Err(other) => RefreshError::Decompress(other),
    }
}
