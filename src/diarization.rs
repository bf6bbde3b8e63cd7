use crate::config::DiarizationConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// A diarized speech segment attributed to one speaker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeakerTurn {
    /// Speaker label, normalized to the trailing index ("SPEAKER_00" -> "00")
    pub speaker: String,
    /// Segment start in seconds
    pub start: f64,
    /// Segment end in seconds
    pub end: f64,
}

/// Raw helper output line before label normalization
#[derive(Debug, Deserialize)]
struct HelperTurn {
    speaker: String,
    start: f64,
    end: f64,
}

/// Speaker diarization via an external helper wrapping the pretrained
/// pipeline.
///
/// The helper is expected to print a JSON array of
/// `{"speaker": "...", "start": s, "end": s}` objects on stdout.
pub struct Diarizer {
    config: DiarizationConfig,
}

impl Diarizer {
    pub fn new(config: DiarizationConfig) -> Self {
        Self { config }
    }

    /// Run diarization on a mono 16kHz WAV file.
    pub async fn diarize(&self, audio_path: &Path) -> Result<Vec<SpeakerTurn>> {
        info!(
            "🗣️  Running speaker diarization ({}) on {}",
            self.config.model,
            audio_path.display()
        );

        let mut command = Command::new(&self.config.helper_command);
        command
            .args(["--model", &self.config.model, "--output", "json"])
            .arg(audio_path);

        if let Some(token) = &self.config.hf_token {
            command.env("HF_TOKEN", token);
        }

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| {
                anyhow!(
                    "diarization timed out after {}s for {}",
                    self.config.timeout_seconds,
                    audio_path.display()
                )
            })?
            .with_context(|| {
                format!(
                    "failed to run diarization helper '{}' (is it installed?)",
                    self.config.helper_command
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "diarization helper failed for {}: {}",
                audio_path.display(),
                stderr.trim()
            ));
        }

        let turns = parse_helper_output(&output.stdout)?;
        info!("✅ Diarization done, {} speaker turns", turns.len());
        Ok(turns)
    }
}

fn parse_helper_output(stdout: &[u8]) -> Result<Vec<SpeakerTurn>> {
    let raw: Vec<HelperTurn> =
        serde_json::from_slice(stdout).context("diarization helper produced invalid JSON")?;

    let mut turns: Vec<SpeakerTurn> = raw
        .into_iter()
        .map(|t| SpeakerTurn {
            speaker: normalize_speaker_label(&t.speaker),
            start: t.start,
            end: t.end,
        })
        .collect();

    turns.sort_by(|a, b| a.start.total_cmp(&b.start));

    for turn in &turns {
        debug!(
            "turn: speaker {} [{:.2}-{:.2}]",
            turn.speaker, turn.start, turn.end
        );
    }

    Ok(turns)
}

/// Pipeline labels look like "SPEAKER_00"; keep only the trailing index.
fn normalize_speaker_label(label: &str) -> String {
    label
        .rsplit('_')
        .next()
        .unwrap_or(label)
        .to_string()
}
