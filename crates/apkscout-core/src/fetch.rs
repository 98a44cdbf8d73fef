//! Streaming artifact fetch.
//!
//! Relays bytes from a resolved upstream URL to any async writer. This
//! is the proxy path for catalogs that block direct linking: the
//! request goes out with the browser UA and an optional catalog
//! Referer, and the body is streamed through without buffering.

use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, header};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Errors from a streaming fetch. This is the one fallible public
/// surface of the crate; resolution itself never errors.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure writing to the destination.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned status {status}")]
    Status {
        /// The HTTP status code.
        status: u16,
    },
}

/// Streaming fetch parameters.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Overall transfer timeout. Artifacts are large; the default is
    /// five minutes.
    pub timeout: Duration,
    /// Referer header, for hosts that check one.
    pub referer: Option<String>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            referer: None,
        }
    }
}

/// Stream the body of `url` into `writer`, returning the byte count.
pub async fn stream_to<W: AsyncWrite + Unpin>(
    client: &Client,
    url: &str,
    writer: &mut W,
    policy: &FetchPolicy,
) -> Result<u64, FetchError> {
    let mut request = client
        .get(url)
        .header(header::USER_AGENT, crate::BROWSER_USER_AGENT)
        .timeout(policy.timeout);
    if let Some(referer) = &policy.referer {
        request = request.header(header::REFERER, referer);
    }

    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
        });
    }

    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}
