use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Response, Url};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::FetchError;

/// Tuning knobs for a [`Downloader`].
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Upper bound for a whole download, headers and body included.
    pub timeout: Duration,
    /// Upper bound for establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Largest accepted body in bytes; `None` disables the check.
    pub max_bytes: Option<u64>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            max_bytes: None,
        }
    }
}

/// HTTP downloader that streams response bodies straight to disk.
///
/// One instance is meant to be shared by every request so the underlying
/// connection pool is reused.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    max_bytes: Option<u64>,
}

impl Downloader {
    pub fn new(options: DownloadOptions) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("tunewave-fetch/", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            max_bytes: options.max_bytes,
        })
    }

    /// Download `url` into `dest`, returning the number of bytes written.
    ///
    /// `dest` is created (or truncated). If anything fails after it was
    /// created the partial file is removed again.
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let parsed = parse_url(url)?;
        debug!(url, dest = %dest.display(), "download started");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        if let (Some(limit), Some(declared)) = (self.max_bytes, response.content_length()) {
            if declared > limit {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit,
                });
            }
        }

        let mut file = File::create(dest).await?;
        let result = self.write_body(url, response, &mut file).await;
        drop(file);

        match result {
            Ok(written) => {
                debug!(url, bytes = written, "download finished");
                Ok(written)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(dest).await {
                    warn!(path = %dest.display(), error = %rm, "failed to remove partial download");
                }
                Err(e)
            }
        }
    }

    async fn write_body(
        &self,
        url: &str,
        response: Response,
        file: &mut File,
    ) -> Result<u64, FetchError> {
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::from_reqwest(url, e))?;
            written += chunk.len() as u64;
            if let Some(limit) = self.max_bytes {
                if written > limit {
                    return Err(FetchError::TooLarge {
                        url: url.to_string(),
                        limit,
                    });
                }
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written)
    }
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            message: format!("unsupported scheme '{other}'"),
        }),
    }
}
