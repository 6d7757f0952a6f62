//! `webcam-rngd`: the `/random` query service.
//!
//! Serves one ready-made entropy block per request out of the shared
//! buffer, kicking off a background refill whenever a request drains the
//! buffer empty or leaves it under its low-water mark, mirroring the
//! reference's FastAPI `startup`/`get_random` pair.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde::Serialize;

use webcam_rng::config::Settings;
use webcam_rng::context::PipelineContext;
use webcam_rng::pipeline;

#[derive(Parser, Debug)]
#[command(name = "webcam-rngd", version, about = "Webcam-entropy query service")]
struct Args {
    /// Path to a JSON settings file. Falls back to WEBCAM_RNG_CONFIG, then defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct RandomResponse {
    random_hex: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_from_env()?,
    };
    webcam_rng::logging::init(&settings.log_dir);

    let bind_addr = settings.bind_addr.clone();
    let ctx = Arc::new(PipelineContext::build(settings)?);

    if ctx.buffer.size() < ctx.settings.buffer_size {
        let startup_ctx = ctx.clone();
        tokio::spawn(async move {
            pipeline::run_refill_round(&startup_ctx).await;
        });
    }

    let app = Router::new()
        .route("/random", get(get_random))
        .with_state(ctx);

    log::info!("webcam-rngd listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_random(
    State(ctx): State<Arc<PipelineContext>>,
) -> Result<Json<RandomResponse>, StatusCode> {
    if ctx.buffer.size() == 0 {
        pipeline::run_refill_round(&ctx).await;
    }

    let value = ctx.buffer.pop().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    pipeline::maybe_schedule_refill(ctx.clone());
    Ok(Json(RandomResponse { random_hex: value }))
}
