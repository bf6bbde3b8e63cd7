use anyhow::Result;
use clap::Parser;
use recording_scribe::config::Config;
use recording_scribe::video::VideoDownscaler;
use std::path::PathBuf;
use tracing::info;

/// Downscale oversized recordings to 480p before archiving or transcription.
#[derive(Parser)]
#[command(name = "downscale-480p")]
#[command(about = "Batch downscale oversized videos to 480p H.264/AAC")]
struct Cli {
    /// Directory to scan for oversized videos
    #[arg(default_value = ".")]
    input_dir: PathBuf,

    /// Output folder for the downscaled copies
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Size threshold in GiB; smaller files are left alone
    #[arg(long, default_value_t = 3.0)]
    threshold_gib: f64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "recording_scribe=debug,info"
        } else {
            "recording_scribe=info,warn"
        })
        .init();

    let config = Config::load().unwrap_or_default();
    let mut downscale = config.downscale;
    downscale.size_threshold_bytes = (cli.threshold_gib * 1024.0 * 1024.0 * 1024.0) as u64;

    let downscaler = VideoDownscaler::new(downscale);
    let report = downscaler
        .downscale_directory(&cli.input_dir, &cli.output_dir)
        .await?;

    info!(
        "Done. Converted: {}, skipped (existing): {}, skipped (under threshold): {}, failed: {}",
        report.converted, report.skipped_existing, report.skipped_small, report.failed
    );

    if report.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
