use super::TranscriptLine;
use crate::audio::AudioConverter;
use crate::config::TranscriptionConfig;
use crate::diarization::SpeakerTurn;
use crate::language::Language;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Speech-to-text via a whisper.cpp style CLI, one invocation per diarized
/// speaker turn.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    config: TranscriptionConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self { config }
    }

    /// Verify the whisper CLI and model are reachable before a long batch.
    pub async fn preflight(&self) -> Result<()> {
        if !command_available(&self.config.whisper_command).await {
            return Err(anyhow!(
                "whisper command '{}' not found. Install whisper.cpp or point \
                 transcription.whisper_command at it",
                self.config.whisper_command
            ));
        }
        if !self.config.model_path.exists() {
            return Err(anyhow!(
                "whisper model not found at {}",
                self.config.model_path.display()
            ));
        }
        Ok(())
    }

    /// Transcribe each diarized turn of a mono 16kHz WAV.
    ///
    /// A turn that fails to cut or transcribe is logged and skipped; its
    /// temporary segment file is removed with the segment directory either
    /// way. Turns producing no text are dropped.
    pub async fn transcribe_turns(
        &self,
        converter: &AudioConverter,
        audio_path: &Path,
        turns: &[SpeakerTurn],
        language: Language,
        verbose: bool,
    ) -> Result<Vec<TranscriptLine>> {
        info!("Found {} segments to transcribe.", turns.len());

        let segment_dir = tempfile::Builder::new()
            .prefix("scribe_segments_")
            .tempdir()
            .context("failed to create segment temp directory")?;

        let mut lines = Vec::new();

        for (i, turn) in turns.iter().enumerate() {
            if verbose {
                info!("Transcribing segment {} of {}...", i + 1, turns.len());
            } else {
                debug!("Transcribing segment {} of {}", i + 1, turns.len());
            }

            let segment_path = segment_dir.path().join(format!(
                "segment_{}_{}.wav",
                (turn.start * 1000.0) as u64,
                (turn.end * 1000.0) as u64
            ));

            if let Err(e) = converter
                .cut_segment(audio_path, turn.start, turn.end, &segment_path)
                .await
            {
                warn!("Error cutting segment {}: {}", i + 1, e);
                continue;
            }

            let text = match self.transcribe_segment(&segment_path, language).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Error transcribing segment {}: {}", i + 1, e);
                    continue;
                }
            };

            let _ = tokio::fs::remove_file(&segment_path).await;

            if text.is_empty() {
                continue;
            }

            let line = TranscriptLine {
                speaker: turn.speaker.clone(),
                start: turn.start,
                end: turn.end,
                text,
            };
            if verbose {
                info!("{}", line);
            }
            lines.push(line);
        }

        info!("✅ Whisper transcription done, {} lines", lines.len());
        Ok(lines)
    }

    /// Transcribe one segment WAV, returning the joined plain text.
    async fn transcribe_segment(&self, segment: &Path, language: Language) -> Result<String> {
        let mut command = Command::new(&self.config.whisper_command);
        command
            .arg("-f")
            .arg(segment)
            .arg("-m")
            .arg(&self.config.model_path)
            .args(["-l", language.code()])
            .args(["-t", &self.config.threads.to_string()])
            // plain text on stdout, no timestamps, no progress chatter
            .args(["-nt", "-np"]);

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| {
                anyhow!(
                    "whisper timed out after {}s on {}",
                    self.config.timeout_seconds,
                    segment.display()
                )
            })?
            .with_context(|| format!("failed to run '{}'", self.config.whisper_command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "whisper failed on {}: {}",
                segment.display(),
                stderr.trim()
            ));
        }

        Ok(join_output_lines(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Collapse whisper stdout into a single line of text.
fn join_output_lines(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check if a command is available
async fn command_available(cmd_name: &str) -> bool {
    Command::new(cmd_name)
        .arg("--help")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_output_lines() {
        assert_eq!(
            join_output_lines("  hello there\n\n  general kenobi  \n"),
            "hello there general kenobi"
        );
        assert_eq!(join_output_lines("\n \n"), "");
    }

    #[tokio::test]
    async fn test_missing_command_fails_preflight() {
        let config = TranscriptionConfig {
            whisper_command: "definitely-not-a-real-command".to_string(),
            model_path: std::path::PathBuf::from("models/ggml-large-v3.bin"),
            timeout_seconds: 5,
            threads: 1,
        };
        let transcriber = WhisperTranscriber::new(config);
        assert!(transcriber.preflight().await.is_err());
    }
}
