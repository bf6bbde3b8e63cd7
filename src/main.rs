use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};

mod audio;
mod config;
mod diarization;
mod language;
mod llm;
mod pipeline;
mod rename;
mod transcription;
mod video;

use crate::config::Config;
use crate::language::Language;
use crate::pipeline::{PipelineOptions, RecordingPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Recording Scribe")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Transcribe, refine and summarize meeting and voice recordings")
        .arg(
            Arg::new("input")
                .value_name("FILE_OR_DIR")
                .help("Media file to process, or a directory for batch mode")
                .required(true)
        )
        .arg(
            Arg::new("lang")
                .long("lang")
                .value_name("CODE")
                .help("Transcription language hint")
                .value_parser(["en", "zh"])
                .default_value("en")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("force")
                .long("force")
                .help("Overwrite existing output files")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("no-refine")
                .long("no-refine")
                .help("Skip LLM transcript refinement")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .help("Generate a summary of the refined transcript")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("rename")
                .long("rename")
                .value_name("PREFIX")
                .help("Rename files after the generated summary; optional stem prefix, \
                       defaults to the recording date (implies --summary)")
                .num_args(0..=1)
                .default_missing_value("")
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(if verbose {
            "recording_scribe=debug,info"
        } else {
            "recording_scribe=info,warn"
        })
        .init();

    let input = PathBuf::from(matches.get_one::<String>("input").unwrap());
    let options = PipelineOptions {
        language: Language::from_code(matches.get_one::<String>("lang").unwrap()),
        force: matches.get_flag("force"),
        no_refine: matches.get_flag("no-refine"),
        summary: matches.get_flag("summary"),
        rename: matches.get_one::<String>("rename").cloned(),
        verbose,
    };

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        let mut config = Config::default();
        config.apply_env();
        config
    });

    // The chat API is only needed when refining or summarizing
    if !options.no_refine || options.wants_summary() {
        if let Err(e) = config.validate() {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }

    if !input.exists() {
        error!("File not found: {}", input.display());
        std::process::exit(1);
    }

    info!("🎙️  Recording Scribe starting...");
    info!("📁 Input: {}", input.display());
    info!("🌐 Language hint: {}", options.language.code());

    let pipeline = RecordingPipeline::new(config, options)?;

    if input.is_dir() {
        let report = pipeline.process_directory(&input).await?;
        info!(
            "🎉 Done. {} successful, {} failed, {} skipped (of {})",
            report.successful, report.failed, report.skipped, report.total
        );
    } else {
        let start = std::time::Instant::now();
        pipeline.process_file(&input).await?;
        info!("🎉 Done in {:.1}s", start.elapsed().as_secs_f64());
    }

    Ok(())
}
