//! Refill scheduling: decides when to run a collection-and-conditioning
//! round and guarantees only one runs at a time.

use std::sync::Arc;

use crate::collector;
use crate::conditioner;
use crate::context::PipelineContext;

/// Runs one full round unconditionally: collect, and if the goal was met,
/// condition and push every resulting block onto the buffer. Below-goal
/// rounds are logged and otherwise discarded, matching the reference's
/// `if len(processed_frames) < NUM_SUCCESSFUL_CAMERAS_GOAL: return`.
pub async fn run_refill_round(ctx: &PipelineContext) {
    let frames = collector::run_round(ctx, &ctx.settings).await;
    if frames.len() < ctx.settings.num_successful_cameras_goal {
        log::info!(
            "round collected {} frame(s), below the goal of {}; skipping conditioning",
            frames.len(),
            ctx.settings.num_successful_cameras_goal
        );
        return;
    }

    let secret = ctx.secret;
    let settings = ctx.settings.clone();
    let blocks = match tokio::task::spawn_blocking(move || conditioner::condition(&frames, &secret, &settings)).await {
        Ok(blocks) => blocks,
        Err(e) => {
            log::error!("conditioning task panicked: {e}");
            return;
        }
    };
    for block in &blocks {
        ctx.buffer.push(block.clone());
    }
    log::info!(
        "batch generation complete, {} block(s) produced, buffer size now {}",
        blocks.len(),
        ctx.buffer.size()
    );
}

/// Schedules a background refill if the buffer is below its low-water mark
/// and no refill is already in flight. Returns immediately either way; the
/// refill itself (if started) runs on a spawned task.
pub fn maybe_schedule_refill(ctx: Arc<PipelineContext>) {
    if ctx.buffer.size() >= ctx.settings.buffer_size {
        return;
    }
    let permit = match ctx.refill_gate.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            log::debug!("refill already in flight, not scheduling another");
            return;
        }
    };
    tokio::spawn(async move {
        let _permit = permit;
        run_refill_round(&ctx).await;
    });
}
