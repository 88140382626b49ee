//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use tunewave_fetch::{DownloadOptions, Downloader, FetchError};

use crate::config::Config;
use crate::services::conversion::ConversionService;
use crate::services::transcoder::Transcoder;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Download → transcode pipeline.
    pub converter: Arc<ConversionService>,
}

impl AppState {
    /// Wire the services described by `config`.
    pub fn from_config(config: Config) -> Result<Self, FetchError> {
        let downloader = Downloader::new(DownloadOptions {
            timeout: config.download_timeout,
            max_bytes: Some(config.max_download_bytes),
            ..DownloadOptions::default()
        })?;
        let transcoder = Transcoder::new(config.ffmpeg_path.clone(), config.transcode_timeout);
        let converter = ConversionService::new(downloader, transcoder, config.work_dir.clone());

        Ok(Self {
            config: Arc::new(config),
            converter: Arc::new(converter),
        })
    }
}
