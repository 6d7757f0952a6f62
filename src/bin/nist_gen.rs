//! `webcam-rng-nist`: resumable NIST SP 800-90B test file writer.
//!
//! Appends hex blocks from the pipeline to an output file until it holds
//! `--bits` bits, picking up from whatever the file already contains so a
//! long-running generation can be restarted without losing progress.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use webcam_rng::config::Settings;
use webcam_rng::context::PipelineContext;
use webcam_rng::pipeline;

#[derive(Parser, Debug)]
#[command(name = "webcam-rng-nist", version, about = "Writes a NIST SP 800-90B test file from webcam entropy")]
struct Args {
    /// Total number of bits to accumulate in the output file.
    #[arg(long = "bits")]
    total_bits: u64,

    /// "binary" for raw bytes, "text" for ASCII '0'/'1' characters.
    #[arg(long, value_enum, default_value_t = OutputFormat::Binary)]
    format: OutputFormat,

    /// Output file path, excluding the format-specific extension.
    #[arg(long, default_value = "nist_output")]
    output: PathBuf,

    /// Path to a JSON settings file. Falls back to WEBCAM_RNG_CONFIG, then defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Binary,
    Text,
}

fn hex_to_binary_string(hex: &str) -> String {
    let mut out = String::with_capacity(hex.len() * 4);
    for c in hex.chars() {
        let nibble = c.to_digit(16).unwrap_or(0);
        out.push_str(&format!("{nibble:04b}"));
    }
    out
}

/// Decodes a lowercase hex string (as produced by `blake2b_simd::Hash::to_hex`)
/// back into raw bytes, skipping any byte pair that isn't valid hex.
fn decode_hex(hex: &str) -> Vec<u8> {
    let bytes = hex.as_bytes();
    bytes
        .chunks(2)
        .filter_map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_from_env()?,
    };
    webcam_rng::logging::init(&settings.log_dir);

    let extension = match args.format {
        OutputFormat::Binary => "bin",
        OutputFormat::Text => "txt",
    };
    let output_path = args.output.with_extension(extension);

    let mut bits_generated = match std::fs::metadata(&output_path) {
        Ok(meta) => match args.format {
            OutputFormat::Binary => meta.len() * 8,
            OutputFormat::Text => meta.len(),
        },
        Err(_) => 0,
    };
    if bits_generated > 0 {
        log::info!("found existing {output_path:?} with {bits_generated} bits, resuming");
    }
    if bits_generated >= args.total_bits {
        log::info!("target of {} bits already generated, nothing to do", args.total_bits);
        return Ok(());
    }

    let ctx = PipelineContext::build(settings)?;
    let mut file = OpenOptions::new().create(true).append(true).open(&output_path)?;

    while bits_generated < args.total_bits {
        if ctx.buffer.size() == 0 {
            pipeline::run_refill_round(&ctx).await;
            if ctx.buffer.size() == 0 {
                log::warn!("a collection round produced no output blocks; retrying");
                continue;
            }
        }

        while let Some(hex_value) = ctx.buffer.pop() {
            if bits_generated >= args.total_bits {
                break;
            }
            let bits_written = match args.format {
                OutputFormat::Binary => {
                    let bytes = decode_hex(&hex_value);
                    file.write_all(&bytes)?;
                    (bytes.len() * 8) as u64
                }
                OutputFormat::Text => {
                    let bits = hex_to_binary_string(&hex_value);
                    file.write_all(bits.as_bytes())?;
                    bits.len() as u64
                }
            };
            file.flush()?;
            bits_generated += bits_written;
            let progress = (bits_generated as f64 / args.total_bits as f64).min(1.0);
            print!("\rprogress: {:.1}%", progress * 100.0);
            std::io::stdout().flush().ok();
        }
    }
    println!();
    log::info!("finished; {output_path:?} now holds {bits_generated} bits");
    Ok(())
}
