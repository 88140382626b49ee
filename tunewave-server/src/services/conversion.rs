//! Download → transcode → read pipeline behind `POST /convert`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use tunewave_fetch::{Downloader, FetchError};

use crate::services::transcoder::{CoverArtInputs, TranscodeError, Transcoder};
use crate::services::workspace::JobWorkspace;

/// Which remote input a fetch error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Resource {
    Audio,
    Image,
}

/// Internal failure detail. Callers only ever see a generic message; the
/// variant is kept for logs.
#[derive(Debug, Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConversionError {
    #[error("transcoder binary not found at {}", path.display())]
    DependencyMissing { path: PathBuf },

    #[error("failed to prepare working directory: {0}")]
    Staging(#[source] std::io::Error),

    #[error("failed to fetch {resource}: {source}")]
    Fetch {
        resource: Resource,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("post-processing failed: {0}")]
    PostProcess(#[source] std::io::Error),

    #[error("transcoder produced an empty file")]
    EmptyOutput,
}

impl ConversionError {
    /// Stable label for structured logs, e.g. `"fetch"` or `"transcode"`.
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// A validated conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub audio_url: String,
    pub image_url: String,
    pub artists: Vec<String>,
    pub album: String,
}

#[derive(Debug, Clone)]
pub struct ConversionService {
    downloader: Downloader,
    transcoder: Transcoder,
    work_dir: PathBuf,
}

impl ConversionService {
    pub fn new(downloader: Downloader, transcoder: Transcoder, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloader,
            transcoder,
            work_dir: work_dir.into(),
        }
    }

    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Run the whole pipeline and return the tagged file's bytes.
    ///
    /// The transcoder is checked before any network traffic. Every request
    /// works in its own directory, which is gone when this returns.
    pub async fn convert(&self, job: &ConversionJob) -> Result<Vec<u8>, ConversionError> {
        let binary = self.transcoder.resolve().await.ok_or_else(|| {
            ConversionError::DependencyMissing {
                path: self.transcoder.program().to_path_buf(),
            }
        })?;

        let workspace = JobWorkspace::create_async(self.work_dir.clone())
            .await
            .map_err(ConversionError::Staging)?;
        debug!(binary = %binary.display(), workspace = %workspace.path().display(), "conversion started");

        let result = self.run(&binary, &workspace, job).await;

        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close_async().await {
            if result.is_ok() {
                return Err(ConversionError::PostProcess(e));
            }
            warn!(path = %path.display(), error = %e, "failed to remove workspace");
        }
        result
    }

    async fn run(
        &self,
        binary: &Path,
        workspace: &JobWorkspace,
        job: &ConversionJob,
    ) -> Result<Vec<u8>, ConversionError> {
        let audio_path = workspace.audio_path();
        let image_path = workspace.image_path();
        let output_path = workspace.output_path();

        // Both downloads settle before either error is returned, so nothing
        // is still writing into the workspace when it is removed.
        let (audio, image) = tokio::join!(
            self.fetch(Resource::Audio, &job.audio_url, &audio_path),
            self.fetch(Resource::Image, &job.image_url, &image_path),
        );
        let (audio_bytes, image_bytes) = (audio?, image?);
        info!(audio_bytes, image_bytes, "inputs downloaded");

        self.transcoder
            .embed_cover(
                binary,
                &CoverArtInputs {
                    audio: &audio_path,
                    image: &image_path,
                    output: &output_path,
                    artists: &job.artists,
                    album: &job.album,
                },
            )
            .await?;

        let data = tokio::fs::read(&output_path)
            .await
            .map_err(ConversionError::PostProcess)?;
        if data.is_empty() {
            return Err(ConversionError::EmptyOutput);
        }
        Ok(data)
    }

    async fn fetch(
        &self,
        resource: Resource,
        url: &str,
        dest: &Path,
    ) -> Result<u64, ConversionError> {
        self.downloader
            .download_to(url, dest)
            .await
            .map_err(|source| {
                warn!(%resource, url, error = %source, "download failed");
                ConversionError::Fetch { resource, source }
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use tracing_test::traced_test;
    use tunewave_fetch::DownloadOptions;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(program: PathBuf, work_dir: &Path) -> ConversionService {
        service_with_timeout(program, work_dir, Duration::from_secs(10))
    }

    fn service_with_timeout(program: PathBuf, work_dir: &Path, timeout: Duration) -> ConversionService {
        ConversionService::new(
            Downloader::new(DownloadOptions::default()).unwrap(),
            Transcoder::new(program, timeout),
            work_dir,
        )
    }

    fn job(server: &MockServer) -> ConversionJob {
        ConversionJob {
            audio_url: format!("{}/song.mp4", server.uri()),
            image_url: format!("{}/cover.jpg", server.uri()),
            artists: vec!["Artist One".to_owned(), "Artist Two".to_owned()],
            album: "Debut".to_owned(),
        }
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Writes its own argument list into the output file (the last argument).
    #[cfg(unix)]
    fn stub_transcoder(dir: &Path) -> PathBuf {
        script(dir, "for out; do :; done\nprintf '%s\\n' \"$@\" > \"$out\"")
    }

    #[cfg(unix)]
    async fn media_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/song.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn error_kinds_are_snake_case() {
        assert_eq!(ConversionError::EmptyOutput.kind(), "empty_output");
        assert_eq!(
            ConversionError::DependencyMissing { path: "ffmpeg".into() }.kind(),
            "dependency_missing"
        );
        assert_eq!(Resource::Image.to_string(), "image");
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_binary_skips_downloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let work = TempDir::new().unwrap();
        let svc = service(work.path().join("no-such-ffmpeg"), work.path());

        let err = svc.convert(&job(&server)).await.unwrap_err();

        assert!(matches!(err, ConversionError::DependencyMissing { .. }));
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[traced_test]
    async fn audio_404_fails_and_leaves_nothing_behind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/song.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(&server)
            .await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let svc = service(stub_transcoder(bin.path()), work.path());

        let err = svc.convert(&job(&server)).await.unwrap_err();

        assert!(matches!(
            err,
            ConversionError::Fetch {
                resource: Resource::Audio,
                ..
            }
        ));
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_run_returns_output_and_cleans_up() {
        let server = media_server().await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let svc = service(stub_transcoder(bin.path()), work.path());

        let data = svc.convert(&job(&server)).await.unwrap();
        let text = String::from_utf8(data).unwrap();

        assert!(text.contains("artist=Artist One, Artist Two\n"));
        assert!(text.contains("album=Debut\n"));
        assert!(text.contains("input.mp4\n"));
        assert!(text.contains("cover.jpg\n"));
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn concurrent_jobs_do_not_share_files() {
        let server = MockServer::start().await;
        for name in ["a", "b"] {
            Mock::given(method("GET"))
                .and(path(format!("/{name}.mp4")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(name.as_bytes().to_vec()))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(&server)
            .await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let svc = service(stub_transcoder(bin.path()), work.path());

        let job_for = |name: &str| ConversionJob {
            audio_url: format!("{}/{name}.mp4", server.uri()),
            album: format!("Album {name}"),
            ..job(&server)
        };
        let (job_a, job_b) = (job_for("a"), job_for("b"));
        let (a, b) = tokio::join!(svc.convert(&job_a), svc.convert(&job_b));
        let (a, b) = (String::from_utf8(a.unwrap()).unwrap(), String::from_utf8(b.unwrap()).unwrap());

        assert!(a.contains("album=Album a\n") && !a.contains("Album b"));
        assert!(b.contains("album=Album b\n") && !b.contains("Album a"));
        let dir_of = |text: &str| {
            text.lines()
                .find(|l| l.ends_with("input.mp4"))
                .map(|l| l.trim_end_matches("input.mp4").to_owned())
                .unwrap()
        };
        assert_ne!(dir_of(&a), dir_of(&b));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn image_failure_waits_for_audio_before_cleanup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/song.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"mp4".to_vec())
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let svc = service(stub_transcoder(bin.path()), work.path());

        let err = svc.convert(&job(&server)).await.unwrap_err();

        assert!(matches!(
            err,
            ConversionError::Fetch {
                resource: Resource::Image,
                ..
            }
        ));
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn transcoder_exit_failure_cleans_up() {
        let server = media_server().await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let svc = service(script(bin.path(), "echo 'Invalid data found' >&2\nexit 3"), work.path());

        let err = svc.convert(&job(&server)).await.unwrap_err();

        assert_eq!(err.kind(), "transcode");
        assert!(matches!(
            err,
            ConversionError::Transcode(TranscodeError::Failed { ref stderr, .. })
                if stderr.contains("Invalid data found")
        ));
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn transcoder_timeout_cleans_up() {
        let server = media_server().await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let svc = service_with_timeout(
            script(bin.path(), "exec sleep 5"),
            work.path(),
            Duration::from_millis(200),
        );

        let err = svc.convert(&job(&server)).await.unwrap_err();

        assert!(matches!(err, ConversionError::Transcode(TranscodeError::Timeout(_))));
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_byte_output_is_an_error() {
        let server = media_server().await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let svc = service(
            script(bin.path(), "for out; do :; done\n: > \"$out\""),
            work.path(),
        );

        let err = svc.convert(&job(&server)).await.unwrap_err();

        assert!(matches!(err, ConversionError::EmptyOutput));
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn repeated_job_produces_the_same_tags() {
        let server = media_server().await;
        let bin = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let svc = service(stub_transcoder(bin.path()), work.path());
        let job = job(&server);

        let tags = |data: Vec<u8>| -> Vec<String> {
            String::from_utf8(data)
                .unwrap()
                .lines()
                .filter(|l| l.starts_with("artist=") || l.starts_with("album="))
                .map(str::to_owned)
                .collect()
        };
        let first = tags(svc.convert(&job).await.unwrap());
        let second = tags(svc.convert(&job).await.unwrap());

        assert_eq!(first, ["artist=Artist One, Artist Two", "album=Debut"]);
        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }
}
