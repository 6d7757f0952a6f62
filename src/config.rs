//! Pipeline configuration.
//!
//! A single typed, `serde`-deserialisable struct carrying every tunable the
//! reference implementation hard-coded as a module constant, plus the file
//! paths it fixed as relative filenames (`webcams.txt`, `rng_buffer.db`,
//! `webcam_rng.log`). Unlike the teacher's `RecordingConfig`/`WebcamConfig`,
//! this is never parked behind a `lazy_static`/`RwLock` singleton: the
//! pipeline's design explicitly replaces module-level global state with a
//! context object owned by the process (see [`crate::context`]), and
//! settings are loaded once at startup and treated as immutable afterwards.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, WebcamRngError};

/// Minimum successful frames a round must collect before conditioning runs.
pub const NUM_SUCCESSFUL_CAMERAS_GOAL_DEFAULT: usize = 100;
/// Output blocks produced per successful round.
pub const NUM_RANDOMS_PER_FETCH_DEFAULT: usize = 10;
/// Crop window taken from every validated frame (width, height).
pub const CROP_SIZE: (u32, u32) = (100, 100);
/// Digest length, in bytes, of one output block.
pub const RANDOM_BYTES: usize = 64;
/// Total per-request timeout, in seconds.
pub const FETCH_TIMEOUT_SECS_DEFAULT: u64 = 10;
/// Low-water mark that triggers a refill.
pub const BUFFER_SIZE_DEFAULT: usize = 50;
/// Consecutive per-round failures before a URL is disabled.
pub const FAILURE_THRESHOLD_DEFAULT: u32 = 10;
/// Maximum number of concurrent in-flight fetches.
pub const FETCH_CONCURRENCY_DEFAULT: usize = 50;
/// Hard cap on a single snapshot/HTML-embedded-image body.
pub const MAX_SNAPSHOT_BYTES: usize = 4 * 1024 * 1024;
/// Hard cap on bytes scanned while hunting for an MJPEG EOI marker.
pub const MAX_MJPEG_SCAN_BYTES: usize = 2 * 1024 * 1024;
/// Number of recent fingerprints retained per camera for dedup.
pub const RECENT_DIGEST_WINDOW: usize = 4;
/// Maximum decoded pixel count `image` will accept (width * height).
pub const MAX_IMAGE_PIXELS: u64 = 100_000_000;

/// Personalisation tag for the crop-coordinate PRF.
pub const PERSON_CROP: &[u8] = b"crop-v1";
/// Personalisation tag for the final conditioning hash.
pub const PERSON_CONDITION: &[u8] = b"webcam-rng-v3";

/// Process-wide pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path to the webcam list file.
    pub webcam_file: PathBuf,
    /// Path to the persistent buffer database.
    pub db_file: PathBuf,
    /// Directory rotating log files are written to.
    pub log_dir: PathBuf,
    /// Minimum successful frames per round before conditioning runs.
    pub num_successful_cameras_goal: usize,
    /// Output blocks produced per successful round.
    pub num_randoms_per_fetch: usize,
    /// Per-request timeout, in seconds.
    pub fetch_timeout_secs: u64,
    /// Buffer low-water mark.
    pub buffer_size: usize,
    /// Consecutive failures before a camera is disabled.
    pub failure_threshold: u32,
    /// Maximum concurrent in-flight fetches.
    pub fetch_concurrency: usize,
    /// Address the query service binds to.
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        let base = default_data_dir();
        Self {
            webcam_file: base.join("webcams.txt"),
            db_file: base.join("rng_buffer.db"),
            log_dir: base.join("logs"),
            num_successful_cameras_goal: NUM_SUCCESSFUL_CAMERAS_GOAL_DEFAULT,
            num_randoms_per_fetch: NUM_RANDOMS_PER_FETCH_DEFAULT,
            fetch_timeout_secs: FETCH_TIMEOUT_SECS_DEFAULT,
            buffer_size: BUFFER_SIZE_DEFAULT,
            failure_threshold: FAILURE_THRESHOLD_DEFAULT,
            fetch_concurrency: FETCH_CONCURRENCY_DEFAULT,
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Resolves the default data directory: an OS data directory when available,
/// falling back to the current directory so the reference implementation's
/// fixed relative filenames (`webcams.txt`, `rng_buffer.db`,
/// `webcam_rng.log`) still work for anyone running without a config file.
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("webcam-rng"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Settings {
    /// Loads settings from `path` if it exists, otherwise returns the
    /// built-in defaults. A present-but-unparsable file is an error; a
    /// missing file is not.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| WebcamRngError::Config(e.to_string()))
    }

    /// Loads settings from the `WEBCAM_RNG_CONFIG` environment variable if
    /// set, otherwise from the built-in defaults.
    pub fn load_from_env() -> Result<Self> {
        match std::env::var_os("WEBCAM_RNG_CONFIG") {
            Some(path) => Self::load(std::path::Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let settings = Settings::default();
        assert_eq!(settings.num_successful_cameras_goal, 100);
        assert_eq!(settings.num_randoms_per_fetch, 10);
        assert_eq!(settings.buffer_size, 50);
        assert_eq!(settings.failure_threshold, 10);
        assert_eq!(settings.fetch_concurrency, 50);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let settings = Settings::load(std::path::Path::new("/nonexistent/path.json")).unwrap();
        assert_eq!(settings.buffer_size, BUFFER_SIZE_DEFAULT);
    }

    #[test]
    fn unparsable_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
