//! Concurrent frame fetching: one HTTP round-trip per camera URL, dispatched
//! by response `Content-Type` to the matching body reader.

pub mod html;
pub mod mjpeg;

use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, USER_AGENT as UA_HEADER};

use crate::config::{Settings, MAX_MJPEG_SCAN_BYTES, MAX_SNAPSHOT_BYTES};
use crate::frame::{self, DedupTracker, FrameError, ProcessedFrame};

/// Matches the reference's fixed `User-Agent`, sent alongside anti-cache
/// headers on every request.
pub const USER_AGENT: &str = "Mozilla/5.0";

/// What a single fetch attempt against one camera URL produced. A dead or
/// misbehaving camera is an expected per-round outcome, not an error: see
/// [`crate::error::WebcamRngError`]'s doc comment.
pub enum FetchOutcome {
    Success(ProcessedFrame),
    Failure,
}

/// Fetches `url`, dispatches its body by content type, and validates the
/// result into a [`ProcessedFrame`]. Every failure path (network error,
/// oversized body, duplicate digest, undecodable image, undersized frame)
/// collapses to [`FetchOutcome::Failure`]; only the disable/goal bookkeeping
/// built on top distinguishes *why* a round didn't get a frame from a URL.
pub async fn fetch_and_process(
    client: &reqwest::Client,
    url: &str,
    settings: &Settings,
    dedup: &parking_lot::Mutex<DedupTracker>,
) -> FetchOutcome {
    let timeout = Duration::from_secs(settings.fetch_timeout_secs);
    let started = Instant::now();

    let request = client
        .get(url)
        .timeout(timeout)
        .header(UA_HEADER, USER_AGENT)
        .header(CACHE_CONTROL, "no-cache")
        .header("Pragma", "no-cache");

    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            log::debug!("fetch error for {url}: {e}");
            return FetchOutcome::Failure;
        }
    };

    if !response.status().is_success() {
        log::debug!("non-success status {} from {url}", response.status());
        return FetchOutcome::Failure;
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    let base_url = response.url().clone();

    let raw_bytes = if content_type.contains("image") {
        match read_capped(response, MAX_SNAPSHOT_BYTES).await {
            Ok(bytes) if bytes.len() <= MAX_SNAPSHOT_BYTES => Some(bytes),
            Ok(_) => {
                log::warn!("snapshot from {url} is too large (>{MAX_SNAPSHOT_BYTES} bytes)");
                None
            }
            Err(e) => {
                log::debug!("body read error for {url}: {e}");
                None
            }
        }
    } else if content_type.contains("multipart/x-mixed-replace") {
        mjpeg::read_mjpeg_frame(response, MAX_MJPEG_SCAN_BYTES).await
    } else if content_type.contains("text/html") {
        match read_capped(response, MAX_SNAPSHOT_BYTES).await {
            Ok(body) => html::read_html_page(client, &base_url, &body, timeout).await,
            Err(e) => {
                log::warn!("error reading HTML page {url}: {e}");
                None
            }
        }
    } else {
        None
    };

    let Some(raw_bytes) = raw_bytes else {
        return FetchOutcome::Failure;
    };

    let fetch_latency = started.elapsed();
    let digest = frame::fingerprint(&raw_bytes);
    if dedup.lock().check_and_record(url, digest) {
        log::debug!("duplicate frame from {url} within recent window, discarding");
        return FetchOutcome::Failure;
    }

    let raw_len = raw_bytes.len();
    // Decoding is CPU-bound and can take tens of milliseconds for a large
    // snapshot; running it off the async task's own thread keeps a slow
    // decode from stalling unrelated fetches sharing the runtime.
    let decoded = tokio::task::spawn_blocking(move || frame::decode_and_validate(&raw_bytes)).await;
    match decoded {
        Ok(Ok(image)) => FetchOutcome::Success(ProcessedFrame {
            url: url.to_string(),
            image,
            fingerprint: digest,
            raw_len,
            fetch_latency,
        }),
        Ok(Err(FrameError::TooSmall { width, height, min })) => {
            log::debug!("frame from {url} is {width}x{height}, smaller than {min}x{min}");
            FetchOutcome::Failure
        }
        Ok(Err(e)) => {
            log::warn!("could not process image data from {url}: {e}");
            FetchOutcome::Failure
        }
        Err(e) => {
            log::warn!("decode task for {url} panicked: {e}");
            FetchOutcome::Failure
        }
    }
}

/// Reads a response body up to `cap + 1` effective bytes, stopping as soon
/// as it's clear the body exceeds `cap` (matches the reference's
/// `content.read(MAX_SNAPSHOT_BYTES + 1)` / length check pairing).
pub(crate) async fn read_capped(resp: reqwest::Response, cap: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut buf = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
        if buf.len() > cap {
            break;
        }
    }
    Ok(buf)
}
