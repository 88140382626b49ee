use thiserror::Error;

/// Errors that can be returned by tunewave-fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// An HTTP request failed at the transport level.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A filesystem I/O error occurred while writing the download.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The server answered with a non-success status code.
    #[error("{url} responded with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The body is larger than the configured limit.
    #[error("{url} exceeds the download limit of {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    /// The request did not complete within the configured timeout.
    #[error("download of {url} timed out")]
    Timeout { url: String },
}

impl FetchError {
    /// Classify a reqwest error, keeping timeouts distinct from other failures.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Http(err)
        }
    }
}
