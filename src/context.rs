//! The process-owned pipeline context.
//!
//! The reference implementation keeps `_active_camera_urls`,
//! `_failure_counts`, `_recent_digests`, `_buffer`, and `_startup_secret` as
//! module-level globals. This struct replaces that with a single value the
//! process constructs once and threads through as an `Arc`, so a test can
//! build two independent contexts in the same process instead of fighting
//! shared global state.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::RngCore;
use tokio::sync::Semaphore;

use crate::buffer::OutputBuffer;
use crate::config::Settings;
use crate::frame::DedupTracker;
use crate::registry::CameraRegistry;

/// Everything one running pipeline needs, owned in one place.
pub struct PipelineContext {
    pub settings: Settings,
    pub registry: Mutex<CameraRegistry>,
    /// Wrapped in its own `Arc` (rather than just a bare `Mutex`) so a
    /// collection round can clone a 'static handle into each spawned
    /// per-URL fetch task without needing `ctx` itself to be `'static`.
    pub dedup: Arc<Mutex<DedupTracker>>,
    pub buffer: OutputBuffer,
    pub http_client: reqwest::Client,
    /// Process-lifetime BLAKE2b key, generated once at startup (matches the
    /// reference's `_startup_secret = os.urandom(32)`). Never persisted or
    /// logged.
    pub secret: [u8; 32],
    /// Ensures at most one refill round runs at a time.
    pub(crate) refill_gate: Arc<Semaphore>,
}

impl PipelineContext {
    /// Builds a context from `settings`: loads the camera registry, opens
    /// the buffer store, builds the shared HTTP client, and mints a fresh
    /// startup secret. Registry/buffer load failures degrade gracefully per
    /// their own modules' contracts; only the HTTP client build can fail
    /// outright here.
    pub fn build(settings: Settings) -> crate::error::Result<Self> {
        let registry = CameraRegistry::load_from_file(&settings.webcam_file)?;
        let buffer = OutputBuffer::open(&settings.db_file);
        let http_client = reqwest::Client::builder().build()?;

        let mut secret = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret);

        Ok(Self {
            settings,
            registry: Mutex::new(registry),
            dedup: Arc::new(Mutex::new(DedupTracker::new())),
            buffer,
            http_client,
            secret,
            refill_gate: Arc::new(Semaphore::new(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_contexts_in_one_process_do_not_share_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = Settings::default();
        a.db_file = dir.path().join("a.db");
        a.webcam_file = dir.path().join("missing-a.txt");
        let mut b = Settings::default();
        b.db_file = dir.path().join("b.db");
        b.webcam_file = dir.path().join("missing-b.txt");

        let ctx_a = PipelineContext::build(a).unwrap();
        let ctx_b = PipelineContext::build(b).unwrap();

        ctx_a.buffer.push("only-in-a".to_string());
        assert_eq!(ctx_a.buffer.size(), 1);
        assert_eq!(ctx_b.buffer.size(), 0);
        assert_ne!(ctx_a.secret, ctx_b.secret);
    }
}
