//! Frame decoding, fingerprinting, and per-camera duplicate suppression.
//!
//! A "processed frame" is the unit the collector hands to the conditioner:
//! a decoded image plus the bookkeeping (raw byte count, fetch latency,
//! fingerprint) the conditioner folds into the hash state.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use image::{DynamicImage, GenericImageView, ImageDecoder};

use crate::config::{MAX_IMAGE_PIXELS, RECENT_DIGEST_WINDOW};

/// Unkeyed 16-byte BLAKE2b fingerprint of the undecoded response body.
/// Used only for within-camera duplicate suppression, never mixed into the
/// conditioning hash itself.
pub type Fingerprint = [u8; 16];

/// Minimum width/height a decoded frame must have to be croppable.
pub const MIN_FRAME_DIMENSION: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("frame {width}x{height} is smaller than the {min}x{min} crop window")]
    TooSmall { width: u32, height: u32, min: u32 },
    #[error("frame has {pixels} pixels, exceeding the {max} decode limit")]
    TooLarge { pixels: u64, max: u64 },
}

/// A successfully fetched, decoded, and size-validated camera frame.
pub struct ProcessedFrame {
    pub url: String,
    pub image: DynamicImage,
    pub fingerprint: Fingerprint,
    pub raw_len: usize,
    pub fetch_latency: Duration,
}

/// Computes the unkeyed BLAKE2b-16 fingerprint of a raw (undecoded) response
/// body, for duplicate suppression.
pub fn fingerprint(raw_bytes: &[u8]) -> Fingerprint {
    let hash = blake2b_simd::Params::new()
        .hash_length(16)
        .to_state()
        .update(raw_bytes)
        .finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Decodes `raw_bytes`, rejecting frames that exceed [`MAX_IMAGE_PIXELS`] or
/// fall short of the minimum crop dimensions.
///
/// The pixel-count limit mirrors the reference's `Image.MAX_IMAGE_PIXELS`
/// guard against decompression-bomb payloads; it is applied via
/// [`image::Limits`] on the decoder itself, so an oversized image is
/// rejected before its pixel buffer is allocated rather than after.
pub fn decode_and_validate(raw_bytes: &[u8]) -> Result<DynamicImage, FrameError> {
    let mut decoder = image::ImageReader::new(std::io::Cursor::new(raw_bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_decoder()?;

    let (width, height) = decoder.dimensions();
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_IMAGE_PIXELS {
        return Err(FrameError::TooLarge {
            pixels,
            max: MAX_IMAGE_PIXELS,
        });
    }
    if width < MIN_FRAME_DIMENSION || height < MIN_FRAME_DIMENSION {
        return Err(FrameError::TooSmall {
            width,
            height,
            min: MIN_FRAME_DIMENSION,
        });
    }

    let mut limits = image::Limits::default();
    limits.max_alloc = Some(MAX_IMAGE_PIXELS.saturating_mul(4));
    decoder.set_limits(limits)?;
    let image = DynamicImage::from_decoder(decoder)?;
    Ok(image)
}

/// Tracks the last [`RECENT_DIGEST_WINDOW`] fingerprints seen per camera URL
/// so the collector can skip frames a camera is re-serving unchanged.
#[derive(Debug, Default)]
pub struct DedupTracker {
    windows: HashMap<String, VecDeque<Fingerprint>>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `digest` was already seen for `url` within its
    /// retention window. If not, records it (evicting the oldest entry once
    /// the window is full).
    pub fn check_and_record(&mut self, url: &str, digest: Fingerprint) -> bool {
        let window = self.windows.entry(url.to_string()).or_default();
        if window.contains(&digest) {
            return true;
        }
        if window.len() >= RECENT_DIGEST_WINDOW {
            window.pop_front();
        }
        window.push_back(digest);
        false
    }

    /// Drops dedup state for URLs that have just been disabled, matching
    /// the registry's disable operation purging both structures together.
    pub fn purge(&mut self, urls: &HashSet<String>) {
        for url in urls {
            self.windows.remove(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_fingerprint_identically() {
        let a = fingerprint(b"hello world");
        let b = fingerprint(b"hello world");
        assert_eq!(a, b);
        let c = fingerprint(b"hello world!");
        assert_ne!(a, c);
    }

    #[test]
    fn dedup_tracker_flags_repeats_within_window() {
        let mut tracker = DedupTracker::new();
        let digest = [7u8; 16];
        assert!(!tracker.check_and_record("cam1", digest));
        assert!(tracker.check_and_record("cam1", digest));
    }

    #[test]
    fn dedup_tracker_evicts_oldest_past_window() {
        let mut tracker = DedupTracker::new();
        for i in 0..RECENT_DIGEST_WINDOW as u8 {
            let mut d = [0u8; 16];
            d[0] = i;
            assert!(!tracker.check_and_record("cam1", d));
        }
        // The very first digest should now have been evicted.
        let mut first = [0u8; 16];
        first[0] = 0;
        assert!(!tracker.check_and_record("cam1", first));
    }

    #[test]
    fn purge_clears_camera_state() {
        let mut tracker = DedupTracker::new();
        tracker.check_and_record("cam1", [1u8; 16]);
        let mut set = HashSet::new();
        set.insert("cam1".to_string());
        tracker.purge(&set);
        assert!(!tracker.check_and_record("cam1", [1u8; 16]));
    }

    #[test]
    fn decode_rejects_undersized_frames() {
        let mut buf = Vec::new();
        image::DynamicImage::new_rgb8(10, 10)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        let err = decode_and_validate(&buf).unwrap_err();
        assert!(matches!(err, FrameError::TooSmall { .. }));
    }

    #[test]
    fn decode_accepts_a_valid_frame() {
        let mut buf = Vec::new();
        image::DynamicImage::new_rgb8(200, 150)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        let image = decode_and_validate(&buf).unwrap();
        assert_eq!(image.dimensions(), (200, 150));
    }
}
