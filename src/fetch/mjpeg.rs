//! MJPEG (`multipart/x-mixed-replace`) stream reader.
//!
//! Scans the stream for a single complete JPEG frame rather than parsing
//! multipart boundaries: accumulate bytes until a JFIF end-of-image marker
//! appears, then trim back to the nearest start-of-image marker.

use futures::StreamExt;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Reads chunks from `resp` until one full JPEG frame has been assembled or
/// `scan_limit` bytes have been scanned without finding one.
pub async fn read_mjpeg_frame(resp: reqwest::Response, scan_limit: usize) -> Option<Vec<u8>> {
    let url = resp.url().clone();
    let mut data = Vec::new();
    let mut stream = resp.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                log::warn!("error reading MJPEG stream from {url}: {e}");
                return None;
            }
        };
        data.extend_from_slice(&chunk);
        if data.len() > scan_limit {
            log::warn!("MJPEG stream from {url} exceeded scan limit of {scan_limit} bytes");
            return None;
        }
        if let Some(eoi_pos) = find_subslice(&data, &EOI) {
            let frame = &data[..eoi_pos + EOI.len()];
            return Some(match find_subslice(frame, &SOI) {
                Some(soi_pos) => frame[soi_pos..].to_vec(),
                None => frame.to_vec(),
            });
        }
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_soi_to_eoi_span() {
        let data = [0x00, 0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9, 0x99];
        let eoi_pos = find_subslice(&data, &EOI).unwrap();
        let frame = &data[..eoi_pos + EOI.len()];
        let soi_pos = find_subslice(frame, &SOI).unwrap();
        assert_eq!(&frame[soi_pos..], &[0xFF, 0xD8, 0x01, 0x02, 0xFF, 0xD9]);
    }

    #[test]
    fn missing_soi_returns_whole_prefix() {
        let data = [0x01, 0x02, 0xFF, 0xD9];
        let eoi_pos = find_subslice(&data, &EOI).unwrap();
        let frame = &data[..eoi_pos + EOI.len()];
        assert!(find_subslice(frame, &SOI).is_none());
    }
}
