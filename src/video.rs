use crate::config::DownscaleConfig;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Video stream information from ffprobe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub width: u32,
    pub height: u32,
    pub codec: String,
}

/// Probe basic video stream info via ffprobe
pub async fn probe(video_path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
            "-select_streams", "v:0",
        ])
        .arg(video_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(anyhow!("ffprobe failed for {}", video_path.display()));
    }

    let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)?;

    let duration_seconds: f64 = ffprobe_data["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);

    let video_stream = ffprobe_data["streams"]
        .as_array()
        .and_then(|streams| streams.first())
        .ok_or_else(|| anyhow!("No video stream found in {}", video_path.display()))?;

    Ok(VideoInfo {
        path: video_path.to_path_buf(),
        duration: Duration::from_secs_f64(duration_seconds),
        width: video_stream["width"].as_u64().unwrap_or(0) as u32,
        height: video_stream["height"].as_u64().unwrap_or(0) as u32,
        codec: video_stream["codec_name"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
    })
}

/// Outcome counts for a batch downscale run
#[derive(Debug, Clone, Default)]
pub struct DownscaleReport {
    pub converted: usize,
    pub skipped_existing: usize,
    pub skipped_small: usize,
    pub failed: usize,
}

/// Downscales oversized recordings to a smaller archival resolution.
///
/// Screen recordings routinely land in the multi-GiB range; anything over
/// the size threshold gets re-encoded to 480p H.264/AAC.
pub struct VideoDownscaler {
    config: DownscaleConfig,
}

impl VideoDownscaler {
    pub fn new(config: DownscaleConfig) -> Self {
        Self { config }
    }

    /// Downscale every oversized video in `input_dir` into `output_dir`,
    /// skipping outputs that already exist.
    pub async fn downscale_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<DownscaleReport> {
        if !output_dir.is_dir() {
            return Err(anyhow!(
                "output folder does not exist: {}",
                output_dir.display()
            ));
        }

        let mut report = DownscaleReport::default();

        for entry in WalkDir::new(input_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !is_video_file(path) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size <= self.config.size_threshold_bytes {
                report.skipped_small += 1;
                continue;
            }

            let out_path = output_dir.join(entry.file_name());
            if out_path.exists() {
                info!("Skipping (already exists): {}", out_path.display());
                report.skipped_existing += 1;
                continue;
            }

            info!(
                "🎬 Converting: {} ({:.1} GiB) -> {}",
                path.display(),
                size as f64 / (1024.0 * 1024.0 * 1024.0),
                out_path.display()
            );
            if let Ok(stream) = probe(path).await {
                info!(
                    "Source stream: {}x{} {}, {:.0}s",
                    stream.width,
                    stream.height,
                    stream.codec,
                    stream.duration.as_secs_f64()
                );
            }

            match self.downscale_file(path, &out_path).await {
                Ok(()) => report.converted += 1,
                Err(e) => {
                    warn!("Downscale failed for {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Re-encode one video to the configured resolution.
    pub async fn downscale_file(&self, input: &Path, output_path: &Path) -> Result<()> {
        let scale = format!("scale={}:{}", self.config.width, self.config.height);

        let output = Command::new("ffmpeg")
            .arg("-i")
            .arg(input)
            .args(["-vf", &scale])
            .args(["-c:v", "libx264"])
            .args(["-crf", &self.config.crf.to_string()])
            .args(["-c:a", "aac"])
            .arg(output_path)
            .output()
            .await?;

        if !output.status.success() {
            // Don't leave a truncated output behind to be skipped next run
            let _ = tokio::fs::remove_file(output_path).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or("").trim()
            ));
        }

        Ok(())
    }
}

fn is_video_file(path: &Path) -> bool {
    path.is_file()
        && path.extension().map_or(false, |ext| {
            ext.eq_ignore_ascii_case("mov") || ext.eq_ignore_ascii_case("mp4")
        })
}

/// Strip a `_480p` downscale marker from a file stem so outputs are named
/// after the original recording.
pub fn strip_downscale_marker(stem: &str) -> &str {
    stem.strip_suffix("_480p").unwrap_or(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_downscale_marker() {
        assert_eq!(strip_downscale_marker("standup_480p"), "standup");
        assert_eq!(strip_downscale_marker("standup"), "standup");
        assert_eq!(strip_downscale_marker("480p_notes"), "480p_notes");
    }

    #[test]
    fn test_is_video_file_extension_check() {
        assert!(!is_video_file(Path::new("/tmp/notes.txt")));
        assert!(!is_video_file(Path::new("/tmp/missing.mov"))); // not a file
    }
}
