//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the mirror:
//! - Building the HTTP client with the configured connect timeout and user agent
//! - Streaming a response body into a local writer under a per-read timeout
//! - Classifying failures as transient (remote) or local (write)
//!
//! The crawler only sees the [`Fetcher`] trait, so tests can substitute an
//! in-memory repository.

use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::io::Write;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single retrieval
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or no response arrived
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body broke off after some bytes were already written
    #[error("{url} broke off after {received} bytes: {source}")]
    Body {
        url: String,
        received: u64,
        source: reqwest::Error,
    },

    /// The server sent nothing for a whole timeout period
    #[error("{url} stalled for {secs}s after {received} bytes")]
    Stalled { url: String, received: u64, secs: u64 },

    /// The local destination refused the data
    #[error("local write failed: {0}")]
    Write(#[source] std::io::Error),
}

impl FetchError {
    /// Remote-side failures that a later run may not hit again
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Write(_))
    }
}

/// Retrieves a URL into a writer
///
/// Implementations must not be re-entered: the crawler never holds two
/// retrievals open at once.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Streams the body at `url` into `dest`, returning the byte count
    async fn fetch_to(&self, url: &str, dest: &mut (dyn Write + Send)) -> Result<u64, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// No overall request deadline is set: a download of any size may take as
/// long as data keeps arriving. [`HttpFetcher`] bounds each read instead.
///
/// # Example
///
/// ```no_run
/// use pkgmirror::config::HttpConfig;
/// use pkgmirror::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    read_timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher that gives up when the server is silent for `timeout_secs`
    pub fn new(config: &HttpConfig, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            read_timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn stalled(&self, url: &str, received: u64) -> FetchError {
        FetchError::Stalled {
            url: url.to_string(),
            received,
            secs: self.read_timeout.as_secs(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_to(&self, url: &str, dest: &mut (dyn Write + Send)) -> Result<u64, FetchError> {
        let mut response = tokio::time::timeout(self.read_timeout, self.client.get(url).send())
            .await
            .map_err(|_| self.stalled(url, 0))?
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut received: u64 = 0;
        loop {
            let chunk = tokio::time::timeout(self.read_timeout, response.chunk())
                .await
                .map_err(|_| self.stalled(url, received))?;

            match chunk {
                Ok(Some(bytes)) => {
                    dest.write_all(&bytes).map_err(FetchError::Write)?;
                    received += bytes.len() as u64;
                }
                Ok(None) => break,
                Err(source) => {
                    return Err(FetchError::Body {
                        url: url.to_string(),
                        received,
                        source,
                    })
                }
            }
        }

        dest.flush().map_err(FetchError::Write)?;
        tracing::trace!("Fetched {} bytes from {}", received, url);
        Ok(received)
    }
}
