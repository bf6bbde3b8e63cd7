use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::audio::AudioConverter;
use crate::config::{Config, OutputConfig, ProcessingConfig};
use crate::diarization::Diarizer;
use crate::language::Language;
use crate::llm::refine::Refiner;
use crate::rename;
use crate::transcription::{self, SrtWriter, TranscriptLine, WhisperTranscriber};
use crate::video::strip_downscale_marker;

/// Output artifact paths derived from an input recording.
///
/// All paths live next to the input; the stem has any `_480p` downscale
/// marker removed so a downscaled copy produces the same artifact names as
/// the original.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub stem: String,
    pub raw_transcript: PathBuf,
    pub clean_transcript: PathBuf,
    pub summary: PathBuf,
    pub srt: PathBuf,
    suffixes: OutputConfig,
}

impl OutputPaths {
    pub fn derive(input: &Path, config: &OutputConfig) -> Self {
        let raw_stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = strip_downscale_marker(&raw_stem).to_string();
        let dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        Self::from_parts(dir, stem, config.clone())
    }

    fn from_parts(dir: PathBuf, stem: String, suffixes: OutputConfig) -> Self {
        let join = |suffix: &str| dir.join(format!("{}{}", stem, suffix));
        Self {
            raw_transcript: join(&suffixes.raw_transcript_suffix),
            clean_transcript: join(&suffixes.clean_transcript_suffix),
            summary: join(&suffixes.summary_suffix),
            srt: join(&suffixes.srt_suffix),
            dir,
            stem,
            suffixes,
        }
    }

    /// The same artifact set under a different stem (used by renaming).
    pub fn with_stem(&self, new_stem: &str) -> Self {
        Self::from_parts(self.dir.clone(), new_stem.to_string(), self.suffixes.clone())
    }
}

/// Per-run options from the CLI
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub language: Language,
    pub force: bool,
    pub no_refine: bool,
    pub summary: bool,
    /// Rename outputs after the generated summary; the string is a stem
    /// prefix, empty meaning "use the recording date".
    pub rename: Option<String>,
    pub verbose: bool,
}

impl PipelineOptions {
    /// Renaming needs a summary to derive the filename from.
    pub fn wants_summary(&self) -> bool {
        self.summary || self.rename.is_some()
    }
}

/// What happened to a single file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Completed,
    /// Outputs already present and no force flag given
    SkippedExisting,
}

/// Batch run counts
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// The end-to-end recording pipeline: convert, diarize, transcribe, refine,
/// summarize, rename. Files are processed strictly sequentially.
pub struct RecordingPipeline {
    config: Config,
    options: PipelineOptions,
    converter: AudioConverter,
    diarizer: Diarizer,
    transcriber: WhisperTranscriber,
    refiner: Option<Refiner>,
}

impl RecordingPipeline {
    pub fn new(config: Config, options: PipelineOptions) -> Result<Self> {
        // Refinement and summarization both go through the chat API; skip
        // client construction entirely when neither is requested.
        let refiner = if !options.no_refine || options.wants_summary() {
            Some(Refiner::new(&config.llm)?)
        } else {
            None
        };

        Ok(Self {
            converter: AudioConverter::new(config.audio.target_sample_rate),
            diarizer: Diarizer::new(config.diarization.clone()),
            transcriber: WhisperTranscriber::new(config.transcription.clone()),
            refiner,
            config,
            options,
        })
    }

    /// Process one recording through the full pipeline.
    pub async fn process_file(&self, input: &Path) -> Result<FileOutcome> {
        let start = Instant::now();

        if !input.exists() {
            return Err(anyhow!("File not found: {}", input.display()));
        }

        let outputs = OutputPaths::derive(input, &self.config.output);

        if !self.options.force && cache_complete(&outputs, self.options.wants_summary()) {
            info!(
                "Outputs for {} already exist. Use --force to overwrite.",
                outputs.stem
            );
            return Ok(FileOutcome::SkippedExisting);
        }

        let lines = self.load_or_generate_transcript(input, &outputs).await?;

        if self.options.force || !outputs.srt.exists() {
            SrtWriter::from_lines(&lines).save_to_file(&outputs.srt).await?;
        }

        let raw_text = transcription::format_transcript(&lines);

        let clean_text = match (&self.refiner, self.options.no_refine) {
            (Some(refiner), false) => refiner.refine_transcript(&raw_text).await,
            _ => {
                info!("Skipping transcript refinement");
                raw_text
            }
        };
        tokio::fs::write(&outputs.clean_transcript, &clean_text).await?;
        info!("Refined transcript: {}", outputs.clean_transcript.display());

        if self.options.wants_summary() {
            if let Some(refiner) = &self.refiner {
                let summary = refiner.summarize(&clean_text).await;
                tokio::fs::write(&outputs.summary, &summary).await?;
                info!("Summary: {}", outputs.summary.display());

                if let Some(prefix) = &self.options.rename {
                    let filename_summary = refiner.filename_summary(&summary).await;
                    let new_stem = rename::build_new_stem(&outputs.stem, prefix, &filename_summary);
                    if new_stem != outputs.stem {
                        let report = rename::rename_with_summary(input, &outputs, &new_stem).await?;
                        info!(
                            "Renamed {} files to stem '{}'",
                            report.renamed.len(),
                            new_stem
                        );
                    }
                }
            }
        }

        info!(
            "✅ Processed {} in {:.1}s",
            input.display(),
            start.elapsed().as_secs_f64()
        );
        Ok(FileOutcome::Completed)
    }

    /// Load the raw transcript if it exists, otherwise produce it through
    /// conversion, diarization and transcription.
    async fn load_or_generate_transcript(
        &self,
        input: &Path,
        outputs: &OutputPaths,
    ) -> Result<Vec<TranscriptLine>> {
        if outputs.raw_transcript.exists() {
            info!(
                "Found existing raw transcript at {}, skipping audio conversion, \
                 diarization, and transcription.",
                outputs.raw_transcript.display()
            );
            let text = tokio::fs::read_to_string(&outputs.raw_transcript).await?;
            return Ok(transcription::parse_transcript(&text));
        }

        // Fail before the expensive conversion and diarization steps if the
        // whisper CLI or model is missing.
        self.transcriber.preflight().await?;

        let audio = self.converter.ensure_wav_mono_16k(input).await?;

        let result = self.diarize_and_transcribe(&audio.path).await;

        if !self.config.audio.keep_intermediate {
            audio.cleanup().await;
        }

        let lines = result?;
        tokio::fs::write(
            &outputs.raw_transcript,
            transcription::format_transcript(&lines),
        )
        .await?;
        info!("Raw transcript: {}", outputs.raw_transcript.display());

        Ok(lines)
    }

    async fn diarize_and_transcribe(&self, audio_path: &Path) -> Result<Vec<TranscriptLine>> {
        let turns = self.diarizer.diarize(audio_path).await?;
        self.transcriber
            .transcribe_turns(
                &self.converter,
                audio_path,
                &turns,
                self.options.language,
                self.options.verbose,
            )
            .await
    }

    /// Process every supported media file in a directory, sequentially.
    ///
    /// A failed file is logged and skipped; the batch continues.
    pub async fn process_directory(&self, input_dir: &Path) -> Result<BatchReport> {
        let files = discover_media(input_dir, &self.config.processing);

        let mut report = BatchReport {
            total: files.len(),
            ..Default::default()
        };

        if files.is_empty() {
            warn!(
                "No supported media files found in {}",
                input_dir.display()
            );
            return Ok(report);
        }

        info!("Batch processing started. Found {} files.", files.len());

        for (i, file) in files.iter().enumerate() {
            info!("({}/{}) Processing: {}", i + 1, files.len(), file.display());
            let start = Instant::now();

            match self.process_file(file).await {
                Ok(FileOutcome::Completed) => {
                    info!(
                        "SUCCESS: {} (took {:.1}s)",
                        file.display(),
                        start.elapsed().as_secs_f64()
                    );
                    report.successful += 1;
                }
                Ok(FileOutcome::SkippedExisting) => {
                    report.skipped += 1;
                }
                Err(e) => {
                    error!("FAIL: {}: {:#}", file.display(), e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Batch processing complete. Success: {}, Failed: {}, Skipped: {}",
            report.successful, report.failed, report.skipped
        );
        if report.failed > 0 {
            warn!(
                "Some files failed. Retry them individually or run with --force \
                 to overwrite existing outputs."
            );
        }

        Ok(report)
    }
}

/// Completion cache check: the refined transcript must exist, and the
/// summary too when one is requested this run.
fn cache_complete(outputs: &OutputPaths, wants_summary: bool) -> bool {
    outputs.clean_transcript.exists() && (!wants_summary || outputs.summary.exists())
}

/// Discover supported media files, sorted for deterministic batch order.
pub fn discover_media(dir: &Path, config: &ProcessingConfig) -> Vec<PathBuf> {
    let max_depth = if config.recursive { usize::MAX } else { 1 };

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| {
                    let ext = ext.to_lowercase();
                    config.supported_extensions.contains(&ext)
                })
        })
        .map(|e| e.into_path())
        .collect();

    files.sort();
    files
}
