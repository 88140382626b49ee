//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,https://tunewave.vercel.app";

/// Runtime configuration for tunewave-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3001"`).
    pub bind_address: String,

    /// Prefix the conversion routes are nested under (default: `"/api"`).
    /// Empty means the routes are mounted at the root.
    pub base_path: String,

    /// Transcoder executable. A bare name is looked up in `PATH`.
    pub ffmpeg_path: PathBuf,

    /// Directory in which per-request working directories are created.
    pub work_dir: PathBuf,

    /// Origins allowed to call the API from a browser. `None` allows any
    /// origin (configured with `*`).
    pub cors_allowed_origins: Option<Vec<String>>,

    /// Upper bound for each remote download.
    pub download_timeout: Duration,

    /// Upper bound for one transcoder run.
    pub transcode_timeout: Duration,

    /// Largest accepted remote resource, in bytes.
    pub max_download_bytes: u64,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_docs: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Self {
            bind_address: env_or("TUNEWAVE_BIND", "0.0.0.0:3001"),
            base_path: normalize_base_path(&env_or("TUNEWAVE_BASE_PATH", "/api")),
            ffmpeg_path: PathBuf::from(env_or("TUNEWAVE_FFMPEG_PATH", "ffmpeg")),
            work_dir: lookup("TUNEWAVE_WORK_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            cors_allowed_origins: parse_origins(&env_or("TUNEWAVE_CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
            download_timeout: Duration::from_secs(parse_or(&lookup, "TUNEWAVE_DOWNLOAD_TIMEOUT_SECS", 60)),
            transcode_timeout: Duration::from_secs(parse_or(&lookup, "TUNEWAVE_TRANSCODE_TIMEOUT_SECS", 120)),
            max_download_bytes: parse_or(&lookup, "TUNEWAVE_MAX_DOWNLOAD_MB", 200u64).saturating_mul(1024 * 1024),
            log_level: env_or("TUNEWAVE_LOG", "info"),
            log_json: lookup("TUNEWAVE_LOG_JSON").is_some_and(|v| is_truthy(&v)),
            enable_docs: lookup("TUNEWAVE_ENABLE_DOCS").is_none_or(|v| is_truthy(&v)),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// `"/api/"` → `"/api"`, `"api"` → `"/api"`, `"/"` → `""`.
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_owned())
        .filter(|s| !s.is_empty())
        .collect();

    if origins.iter().any(|o| o == "*") {
        None
    } else {
        Some(origins)
    }
}
