//! Entropy conditioning: turns a round's validated frames into
//! [`crate::config::NUM_RANDOMS_PER_FETCH_DEFAULT`]-many keyed BLAKE2b
//! digests.
//!
//! Each output block streams every frame's deterministically-cropped,
//! RGB-converted pixels plus its raw size and fetch latency into one keyed
//! hash state, then folds in an OS-entropy tail before finalising. The crop
//! coordinates themselves come from a second, independently-personalised
//! keyed hash so that two output indices never sample the same window of a
//! frame.

use image::GenericImageView;
use rand::RngCore;

use crate::config::{Settings, CROP_SIZE, PERSON_CONDITION, PERSON_CROP, RANDOM_BYTES};
use crate::frame::{Fingerprint, ProcessedFrame};

/// Derives the top-left corner of this output index's crop window for one
/// frame, keyed so the mapping from (frame, index) to window is only
/// predictable to whoever holds the startup secret.
fn derive_crop_xy(digest: &Fingerprint, width: u32, height: u32, out_idx: u64, secret: &[u8]) -> (u32, u32) {
    let max_x = width.saturating_sub(CROP_SIZE.0) + 1;
    let max_y = height.saturating_sub(CROP_SIZE.1) + 1;

    let mut input = Vec::with_capacity(digest.len() + 8);
    input.extend_from_slice(digest);
    input.extend_from_slice(&out_idx.to_be_bytes());

    let seed = blake2b_simd::Params::new()
        .key(secret)
        .personal(PERSON_CROP)
        .hash_length(8)
        .hash(&input);
    let bytes = seed.as_bytes();
    let x = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) % max_x;
    let y = u32::from_be_bytes(bytes[4..8].try_into().unwrap()) % max_y;
    (x, y)
}

/// Produces `settings.num_randoms_per_fetch` hex-encoded output blocks from
/// `frames`. Callers are expected to have already checked `frames.len() >=
/// settings.num_successful_cameras_goal`; this function itself has no
/// opinion on the goal, only on what to do with whatever frames it's given.
pub fn condition(frames: &[ProcessedFrame], secret: &[u8], settings: &Settings) -> Vec<String> {
    let mut blocks = Vec::with_capacity(settings.num_randoms_per_fetch);

    for out_idx in 0..settings.num_randoms_per_fetch as u64 {
        let mut state = blake2b_simd::Params::new()
            .key(secret)
            .personal(PERSON_CONDITION)
            .hash_length(RANDOM_BYTES)
            .to_state();

        let mut any_chunk = false;
        for frame in frames {
            let (width, height) = frame.image.dimensions();
            if width < CROP_SIZE.0 || height < CROP_SIZE.1 {
                // Already enforced by frame::decode_and_validate, but a
                // corrupted in-memory frame should be skipped, not panic.
                continue;
            }
            let (x, y) = derive_crop_xy(&frame.fingerprint, width, height, out_idx, secret);
            let crop = frame.image.crop_imm(x, y, CROP_SIZE.0, CROP_SIZE.1).to_rgb8();

            state.update(crop.as_raw());
            state.update(&(frame.raw_len as u32).to_be_bytes());
            state.update(&(frame.fetch_latency.as_micros() as u32).to_be_bytes());
            any_chunk = true;
        }

        if !any_chunk {
            continue;
        }

        let mut tail = [0u8; 64];
        rand::rngs::OsRng.fill_bytes(&mut tail);
        state.update(&tail);

        blocks.push(state.finalize().to_hex().to_string());
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frame_with(url: &str, width: u32, height: u32, fingerprint: Fingerprint) -> ProcessedFrame {
        ProcessedFrame {
            url: url.to_string(),
            image: image::DynamicImage::new_rgb8(width, height),
            fingerprint,
            raw_len: 1234,
            fetch_latency: Duration::from_millis(5),
        }
    }

    #[test]
    fn crop_coordinates_are_in_bounds() {
        let secret = [9u8; 32];
        for out_idx in 0..5u64 {
            let (x, y) = derive_crop_xy(&[1u8; 16], 200, 150, out_idx, &secret);
            assert!(x + CROP_SIZE.0 <= 200);
            assert!(y + CROP_SIZE.1 <= 150);
        }
    }

    #[test]
    fn exact_crop_size_frame_always_crops_at_origin() {
        let secret = [9u8; 32];
        let (x, y) = derive_crop_xy(&[2u8; 16], 100, 100, 0, &secret);
        assert_eq!((x, y), (0, 0));
    }

    #[test]
    fn condition_produces_one_block_per_output_index() {
        let secret = [1u8; 32];
        let settings = Settings {
            num_randoms_per_fetch: 3,
            ..Settings::default()
        };
        let frames = vec![
            frame_with("a", 200, 200, [1u8; 16]),
            frame_with("b", 150, 120, [2u8; 16]),
        ];
        let blocks = condition(&frames, &secret, &settings);
        assert_eq!(blocks.len(), 3);
        for block in &blocks {
            assert_eq!(block.len(), RANDOM_BYTES * 2);
        }
        assert_ne!(blocks[0], blocks[1]);
    }

    #[test]
    fn condition_with_no_frames_yields_no_blocks() {
        let secret = [1u8; 32];
        let settings = Settings::default();
        assert!(condition(&[], &secret, &settings).is_empty());
    }
}
