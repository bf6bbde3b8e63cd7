use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Audio stream information from ffprobe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u32,
    pub codec: String,
}

/// Audio file handed to diarization and transcription.
///
/// Tracks whether the file is a conversion by-product so the pipeline can
/// delete it afterwards without touching original recordings.
#[derive(Debug)]
pub struct ConvertedAudio {
    pub path: PathBuf,
    temporary: bool,
}

impl ConvertedAudio {
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Remove the intermediate file if one was produced.
    pub async fn cleanup(&self) {
        if !self.temporary {
            return;
        }
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => info!("🧹 Deleted temporary file: {}", self.path.display()),
            Err(e) => warn!("Failed to remove temp file {}: {}", self.path.display(), e),
        }
    }
}

/// Audio converter around ffmpeg/ffprobe
#[derive(Clone)]
pub struct AudioConverter {
    /// Sample rate required by the transcription model
    pub target_sample_rate: u32,
}

impl AudioConverter {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    /// Ensure the input is a mono WAV at the target sample rate.
    ///
    /// A WAV already in the right shape is returned as-is; anything else is
    /// converted into `<stem>_16k_mono.wav` next to the input.
    pub async fn ensure_wav_mono_16k(&self, input: &Path) -> Result<ConvertedAudio> {
        let is_wav = input
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"));

        if is_wav {
            match self.probe(input).await {
                Ok(info) if info.channels == 1 && info.sample_rate == self.target_sample_rate => {
                    debug!("Input already mono {}Hz WAV, skipping conversion", info.sample_rate);
                    return Ok(ConvertedAudio {
                        path: input.to_path_buf(),
                        temporary: false,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!("Could not probe WAV format, converting anyway: {}", e),
            }
        }

        let out_path = intermediate_wav_path(input);
        info!("🎵 Converting {} to mono {}Hz WAV...", input.display(), self.target_sample_rate);

        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-ar", &self.target_sample_rate.to_string(), "-ac", "1"])
            .arg(&out_path)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "ffmpeg conversion failed for {}: {}",
                input.display(),
                last_lines(&stderr, 3)
            ));
        }

        Ok(ConvertedAudio {
            path: out_path,
            temporary: true,
        })
    }

    /// Get audio stream information via ffprobe
    pub async fn probe(&self, audio_path: &Path) -> Result<AudioInfo> {
        let output = Command::new("ffprobe")
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
                "-select_streams", "a:0",
            ])
            .arg(audio_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(anyhow!("ffprobe failed for {}", audio_path.display()));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)?;

        let duration_seconds: f64 = ffprobe_data["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        let audio_stream = ffprobe_data["streams"]
            .as_array()
            .and_then(|streams| streams.first())
            .ok_or_else(|| anyhow!("No audio stream found in {}", audio_path.display()))?;

        Ok(AudioInfo {
            path: audio_path.to_path_buf(),
            duration: Duration::from_secs_f64(duration_seconds),
            sample_rate: audio_stream["sample_rate"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            channels: audio_stream["channels"].as_u64().unwrap_or(0) as u32,
            codec: audio_stream["codec_name"]
                .as_str()
                .unwrap_or("unknown")
                .to_string(),
        })
    }

    /// Cut a `[start, end]` window (seconds) out of a WAV into `output`.
    pub async fn cut_segment(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        output_path: &Path,
    ) -> Result<()> {
        if end <= start {
            return Err(anyhow!("invalid segment window {:.2}-{:.2}", start, end));
        }

        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(source)
            .args([
                "-ss", &format!("{:.3}", start),
                "-t", &format!("{:.3}", end - start),
                "-c", "copy",
            ])
            .arg(output_path)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "ffmpeg segment cut failed at {:.2}-{:.2}: {}",
                start,
                end,
                last_lines(&stderr, 3)
            ));
        }

        Ok(())
    }
}

impl Default for AudioConverter {
    fn default() -> Self {
        Self::new(16000)
    }
}

/// Path for the conversion by-product: `<stem>_16k_mono.wav` beside the input.
pub fn intermediate_wav_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{}_16k_mono.wav", stem))
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_converter_defaults() {
        let converter = AudioConverter::default();
        assert_eq!(converter.target_sample_rate, 16000);
    }

    #[test]
    fn test_intermediate_wav_path() {
        let path = intermediate_wav_path(Path::new("/recordings/standup 2024-05-02.mov"));
        assert_eq!(
            path,
            Path::new("/recordings/standup 2024-05-02_16k_mono.wav")
        );
    }

    #[test]
    fn test_non_temporary_audio_cleanup_is_noop() {
        let audio = ConvertedAudio {
            path: PathBuf::from("/does/not/exist.wav"),
            temporary: false,
        };
        // Must not attempt to delete a file it does not own
        tokio_test::block_on(audio.cleanup());
    }

    #[test]
    fn test_last_lines() {
        assert_eq!(last_lines("a\nb\nc\nd", 2), "c | d");
        assert_eq!(last_lines("only", 3), "only");
    }
}
