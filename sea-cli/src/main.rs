use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;

/// Decode a SEA file into a 16-bit PCM WAV file.
#[derive(Parser)]
#[command(name = "sea")]
struct Args {
    /// Input .sea file
    input: PathBuf,
    /// Output .wav file
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sea=info,sea_codec=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let bytes = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let audio = sea_codec::decode(&bytes)
        .with_context(|| format!("failed to decode {}", args.input.display()))?;

    for (key, value) in sea_codec::metadata_pairs(&audio.metadata) {
        tracing::info!("metadata: {} = {}", key, value);
    }
    tracing::info!(
        "decoded {} frames, {} channels at {} Hz",
        audio.frames,
        audio.channels,
        audio.sample_rate
    );

    let spec = hound::WavSpec {
        channels: audio.channels as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    for &sample in &audio.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    tracing::info!("wrote {}", args.output.display());
    Ok(())
}
