//! HTML camera-page reader: picks a random `<img>` from the page and
//! re-fetches it, so a single camera operator's "viewer page" URL can stand
//! in for a direct snapshot endpoint.

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, USER_AGENT as UA_HEADER};
use scraper::{Html, Selector};

use crate::config::MAX_SNAPSHOT_BYTES;

/// Parses `body` as HTML, shuffles its `<img src>` candidates, and returns
/// the body of the first one that resolves to a same-or-better HTTP image
/// response within `timeout`.
pub async fn read_html_page(
    client: &reqwest::Client,
    base_url: &reqwest::Url,
    body: &[u8],
    timeout: Duration,
) -> Option<Vec<u8>> {
    let text = String::from_utf8_lossy(body);
    let document = Html::parse_document(&text);
    let selector = Selector::parse("img[src]").ok()?;

    let mut sources: Vec<String> = document
        .select(&selector)
        .filter_map(|el| el.value().attr("src"))
        .map(str::to_string)
        .collect();
    if sources.is_empty() {
        return None;
    }
    sources.shuffle(&mut rand::rngs::OsRng);

    for src in sources {
        let img_url = match base_url.join(&src) {
            Ok(u) => u,
            Err(_) => continue,
        };

        let request = client
            .get(img_url.clone())
            .timeout(timeout)
            .header(UA_HEADER, super::USER_AGENT)
            .header(CACHE_CONTROL, "no-cache")
            .header("Pragma", "no-cache");

        let response = match request.send().await {
            Ok(r) => r,
            Err(_) => continue,
        };
        if response.status() != reqwest::StatusCode::OK {
            continue;
        }
        let is_image = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase().contains("image"))
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        match super::read_capped(response, MAX_SNAPSHOT_BYTES).await {
            Ok(bytes) if bytes.len() <= MAX_SNAPSHOT_BYTES => return Some(bytes),
            Ok(_) => {
                log::warn!("image from HTML at {img_url} is too large");
                continue;
            }
            Err(_) => continue,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_img_src_attributes() {
        let html = r#"<html><body><img src="/a.jpg"><img src="b.jpg"></body></html>"#;
        let document = Html::parse_document(html);
        let selector = Selector::parse("img[src]").unwrap();
        let sources: Vec<&str> = document
            .select(&selector)
            .filter_map(|el| el.value().attr("src"))
            .collect();
        assert_eq!(sources, vec!["/a.jpg", "b.jpg"]);
    }
}
