//! Per-request scratch directory.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

const AUDIO_FILE: &str = "input.mp4";
const IMAGE_FILE: &str = "cover.jpg";
const OUTPUT_FILE: &str = "output.mp3";

/// A uniquely named directory holding one request's downloads and output.
///
/// The directory is removed by [`JobWorkspace::close`] or, on every other
/// exit path, when the value is dropped.
#[derive(Debug)]
pub struct JobWorkspace {
    path: PathBuf,
    // `None` once closed.
    dir: Option<TempDir>,
}

impl JobWorkspace {
    /// Create a fresh directory under `parent`, creating `parent` if needed.
    pub fn create(parent: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("tunewave-{}-", Uuid::new_v4().simple()))
            .tempdir_in(parent)?;
        debug!(path = %dir.path().display(), "workspace created");
        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    /// [`JobWorkspace::create`] on the blocking pool.
    pub async fn create_async(parent: PathBuf) -> io::Result<Self> {
        tokio::task::spawn_blocking(move || Self::create(&parent))
            .await
            .map_err(io::Error::other)?
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn audio_path(&self) -> PathBuf {
        self.path.join(AUDIO_FILE)
    }

    pub fn image_path(&self) -> PathBuf {
        self.path.join(IMAGE_FILE)
    }

    pub fn output_path(&self) -> PathBuf {
        self.path.join(OUTPUT_FILE)
    }

    /// Remove the directory and everything in it, reporting failures.
    pub fn close(mut self) -> io::Result<()> {
        if let Some(dir) = self.dir.take() {
            dir.close()?;
            debug!(path = %self.path.display(), "workspace removed");
        }
        Ok(())
    }

    /// [`JobWorkspace::close`] on the blocking pool.
    pub async fn close_async(self) -> io::Result<()> {
        tokio::task::spawn_blocking(move || self.close())
            .await
            .map_err(io::Error::other)?
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!(path = %self.path.display(), "workspace removed on drop"),
                Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove workspace"),
            }
        }
    }
}
