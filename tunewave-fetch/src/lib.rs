//! Streams remote resources to local files.
//!
//! ```rust,ignore
//! let downloader = Downloader::new(DownloadOptions::default())?;
//! let written = downloader.download_to("https://example.com/a.mp4", path).await?;
//! ```

pub mod downloader;
pub mod error;

pub use downloader::{DownloadOptions, Downloader};
pub use error::FetchError;
