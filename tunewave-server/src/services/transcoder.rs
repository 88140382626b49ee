//! FFmpeg invocation for embedding cover art and ID3 tags.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Only the end of stderr is kept; ffmpeg prints the actual failure last.
const STDERR_TAIL_BYTES: usize = 2048;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to spawn transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("transcoder exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("transcoder timed out after {0:?}")]
    Timeout(Duration),
}

/// Files and tags for one cover-art run.
#[derive(Debug, Clone)]
pub struct CoverArtInputs<'a> {
    pub audio: &'a Path,
    pub image: &'a Path,
    pub output: &'a Path,
    pub artists: &'a [String],
    pub album: &'a str,
}

#[derive(Debug, Clone)]
pub struct Transcoder {
    program: PathBuf,
    timeout: Duration,
}

impl Transcoder {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// The configured program, as given.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Locate the executable on disk.
    ///
    /// A path with a directory component must point at an existing file;
    /// a bare name is searched for in `PATH`.
    pub async fn resolve(&self) -> Option<PathBuf> {
        if self.program.components().count() > 1 || self.program.is_absolute() {
            return is_file(&self.program).await.then(|| self.program.clone());
        }

        let search_path = std::env::var_os("PATH")?;
        for dir in std::env::split_paths(&search_path) {
            let candidate = dir.join(&self.program);
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Argument vector that muxes the image into the audio as the front
    /// cover and writes ID3v2.3 artist/album tags.
    pub fn cover_art_args(inputs: &CoverArtInputs<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(inputs.audio.into());
        args.push("-i".into());
        args.push(inputs.image.into());
        args.extend(
            [
                "-c:v",
                "mjpeg",
                "-id3v2_version",
                "3",
                "-metadata:s:v",
                "title=Album cover",
                "-metadata:s:v",
                "comment=Cover (front)",
                "-metadata",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(format!("artist={}", inputs.artists.join(", ")).into());
        args.push("-metadata".into());
        args.push(format!("album={}", inputs.album).into());
        args.push(inputs.output.into());
        args
    }

    /// Run `binary` with [`Self::cover_art_args`], bounded by the configured
    /// timeout. The child is killed if the timeout fires or the future is
    /// dropped.
    pub async fn embed_cover(
        &self,
        binary: &Path,
        inputs: &CoverArtInputs<'_>,
    ) -> Result<(), TranscodeError> {
        let args = Self::cover_art_args(inputs);
        debug!(binary = %binary.display(), ?args, "spawning transcoder");

        let child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(TranscodeError::Spawn)?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| TranscodeError::Timeout(self.timeout))?
            .map_err(TranscodeError::Spawn)?;

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                status: output.status,
                stderr: stderr_tail(&output.stderr),
            });
        }

        info!(output = %inputs.output.display(), "transcoder finished");
        Ok(())
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_owned()
}
