//! One collection round: shuffle the active camera list, fetch all of them
//! concurrently, stop as soon as the success goal is met, and update the
//! registry's failure/disable bookkeeping.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::context::PipelineContext;
use crate::fetch::{self, FetchOutcome};
use crate::frame::ProcessedFrame;

/// Runs a single round against the context's current active URL snapshot.
///
/// Stops early, cancelling every outstanding fetch, as soon as
/// `settings.num_successful_cameras_goal` frames have been collected.
/// Completion order is what matters, not which cameras happened to answer,
/// matching the reference's `asyncio.as_completed` early-exit.
pub async fn run_round(ctx: &PipelineContext, settings: &Settings) -> Vec<ProcessedFrame> {
    let mut urls = ctx.registry.lock().active_urls();
    if urls.is_empty() {
        return Vec::new();
    }
    urls.shuffle(&mut rand::rngs::OsRng);

    let semaphore = Arc::new(Semaphore::new(settings.fetch_concurrency));
    let token = CancellationToken::new();
    let mut join_set = JoinSet::new();

    for url in urls {
        let semaphore = semaphore.clone();
        let token = token.clone();
        let client = ctx.http_client.clone();
        let settings = settings.clone();
        let dedup = ctx.dedup.clone();
        join_set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => return (url, FetchOutcome::Failure),
            };
            tokio::select! {
                _ = token.cancelled() => (url, FetchOutcome::Failure),
                outcome = fetch::fetch_and_process(&client, &url, &settings, &dedup) => (url, outcome),
            }
        });
    }

    let mut frames = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        let (url, outcome) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                log::debug!("fetch task join error: {e}");
                continue;
            }
        };
        match outcome {
            FetchOutcome::Success(frame) => {
                ctx.registry.lock().record_success(&url);
                frames.push(frame);
                if frames.len() >= settings.num_successful_cameras_goal {
                    token.cancel();
                    join_set.abort_all();
                    break;
                }
            }
            FetchOutcome::Failure => {
                ctx.registry.lock().record_failure(&url);
            }
        }
    }
    // Dropping `join_set` here aborts and reaps any task still outstanding
    // after the early break above.
    drop(join_set);

    let disabled = ctx.registry.lock().disable_failing(settings.failure_threshold);
    if !disabled.is_empty() {
        ctx.dedup.lock().purge(&disabled);
    }

    log::info!("collected {} valid frame(s) this round", frames.len());
    frames
}
