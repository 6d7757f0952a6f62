//! `webcam-healthcheck`: verifies every camera in a webcam list actually
//! updates, and comments out the ones that don't.
//!
//! Fetches each URL `--attempts` times, `--interval` seconds apart. A
//! camera is considered alive once any two successive successful reads
//! fingerprint differently; cameras that never change (or never answer)
//! get their line prefixed with `# ` in place, same as the reference tool.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};

use webcam_rng::config::MAX_SNAPSHOT_BYTES;
use webcam_rng::fetch::mjpeg::read_mjpeg_frame;
use webcam_rng::frame::fingerprint;

#[derive(Parser, Debug)]
#[command(name = "webcam-healthcheck", version, about = "Checks webcam liveness and disables stale entries")]
struct Args {
    /// Webcam list file to check and rewrite in place.
    #[arg(long, short = 'f', default_value = "webcams.txt")]
    file: PathBuf,

    /// Seconds between successive checks of the same camera.
    #[arg(long, short = 'i', default_value_t = 60)]
    interval: u64,

    /// Number of checks per camera.
    #[arg(long, short = 'a', default_value_t = 5)]
    attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::init();

    if !args.file.is_file() {
        eprintln!("ERROR: {:?} does not exist", args.file);
        std::process::exit(1);
    }

    let raw = std::fs::read_to_string(&args.file)?;
    let urls: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        println!("no active URLs to check");
        return Ok(());
    }

    println!(
        "checking {} webcam(s)... ({} attempt(s), {}s apart)",
        urls.len(),
        args.attempts,
        args.interval
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let alive = check_urls(&client, &urls, args.interval, args.attempts).await;

    let dead: Vec<&String> = urls.iter().filter(|u| !alive.get(*u).copied().unwrap_or(false)).collect();
    if dead.is_empty() {
        println!("all webcams are updating correctly");
        return Ok(());
    }

    println!("{} camera(s) not updating, commenting them out in {:?}", dead.len(), args.file);
    rewrite_file(&args.file, &alive)?;
    Ok(())
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Option<[u8; 16]> {
    let response = client
        .get(url)
        .header(USER_AGENT, "Mozilla/5.0")
        .header(CACHE_CONTROL, "no-cache")
        .header("Pragma", "no-cache")
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let bytes = if content_type.contains("image") {
        let body = response.bytes().await.ok()?;
        if body.len() > MAX_SNAPSHOT_BYTES {
            return None;
        }
        body.to_vec()
    } else if content_type.contains("multipart/x-mixed-replace") || content_type.contains("mjpeg") {
        read_mjpeg_frame(response, MAX_SNAPSHOT_BYTES).await?
    } else {
        return None;
    };

    Some(fingerprint(&bytes))
}

async fn check_urls(
    client: &reqwest::Client,
    urls: &[String],
    interval: u64,
    attempts: u32,
) -> HashMap<String, bool> {
    let mut alive: HashMap<String, bool> = urls.iter().map(|u| (u.clone(), false)).collect();
    let mut last_digest: HashMap<String, [u8; 16]> = HashMap::new();

    for attempt in 0..attempts {
        let mut pending: FuturesUnordered<_> = urls
            .iter()
            .map(|url| async move { (url.clone(), fetch_once(client, url).await) })
            .collect();

        while let Some((url, digest)) = pending.next().await {
            let Some(digest) = digest else { continue };
            match last_digest.get(&url) {
                None => {
                    last_digest.insert(url, digest);
                }
                Some(previous) if *previous != digest => {
                    alive.insert(url, true);
                }
                Some(_) => {}
            }
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }
    alive
}

fn rewrite_file(path: &PathBuf, alive: &HashMap<String, bool>) -> std::io::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            out.push_str(line);
            out.push('\n');
            continue;
        }
        match alive.get(trimmed) {
            Some(false) => {
                out.push_str("# ");
                out.push_str(trimmed);
                out.push('\n');
            }
            _ => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    let tmp_path = path.with_extension("tmp");
    let mut tmp = std::fs::File::create(&tmp_path)?;
    tmp.write_all(out.as_bytes())?;
    tmp.flush()?;
    drop(tmp);
    std::fs::rename(&tmp_path, path)
}
