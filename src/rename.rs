use anyhow::Result;
use chrono::{Local, NaiveDate};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::pipeline::OutputPaths;

/// Report of a summary-based rename pass
#[derive(Debug, Clone, Default)]
pub struct RenameReport {
    pub renamed: Vec<(PathBuf, PathBuf)>,
    pub skipped_collisions: usize,
    pub missing_sources: usize,
}

fn dashed_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("date regex"))
}

fn compact_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{8})").expect("compact date regex"))
}

/// Extract a `YYYY-MM-DD` prefix from a recording stem.
///
/// Accepts `YYYY-MM-DD` or compact `YYYYMMDD` (reformatted with dashes);
/// falls back to `today` when the stem carries no date.
pub fn date_prefix_from_stem(stem: &str, today: NaiveDate) -> String {
    if let Some(captures) = dashed_date_regex().captures(stem) {
        return captures[1].to_string();
    }

    if let Some(captures) = compact_date_regex().captures(stem) {
        let d = &captures[1];
        return format!("{}-{}-{}", &d[..4], &d[4..6], &d[6..]);
    }

    today.format("%Y-%m-%d").to_string()
}

/// Build the new stem for a recording from an optional user prefix and the
/// generated filename summary. An empty prefix means "use the date".
pub fn build_new_stem(original_stem: &str, prefix: &str, filename_summary: &str) -> String {
    let prefix = if prefix.is_empty() {
        date_prefix_from_stem(original_stem, Local::now().date_naive())
    } else {
        prefix.to_string()
    };
    format!("{}_{}", prefix, filename_summary)
}

/// Rename the media file and all existing output artifacts to `new_stem`.
///
/// Collisions are logged and skipped, never overwritten. Artifacts that
/// were not produced (e.g. no summary requested) just count as missing.
pub async fn rename_with_summary(
    input_file: &Path,
    outputs: &OutputPaths,
    new_stem: &str,
) -> Result<RenameReport> {
    let mut report = RenameReport::default();

    let ext = input_file
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let new_media = if ext.is_empty() {
        outputs.dir.join(new_stem)
    } else {
        outputs.dir.join(format!("{}.{}", new_stem, ext))
    };

    if new_media != input_file {
        safe_rename(input_file, &new_media, &mut report).await;
    }

    let new_outputs = outputs.with_stem(new_stem);
    for (src, dst) in [
        (&outputs.raw_transcript, &new_outputs.raw_transcript),
        (&outputs.clean_transcript, &new_outputs.clean_transcript),
        (&outputs.summary, &new_outputs.summary),
        (&outputs.srt, &new_outputs.srt),
    ] {
        safe_rename(src, dst, &mut report).await;
    }

    Ok(report)
}

/// Rename a file only when the source exists and the target does not.
async fn safe_rename(src: &Path, dst: &Path, report: &mut RenameReport) {
    if !src.exists() {
        report.missing_sources += 1;
        return;
    }
    if dst.exists() {
        warn!("Target file {} already exists. Skipping rename.", dst.display());
        report.skipped_collisions += 1;
        return;
    }
    match tokio::fs::rename(src, dst).await {
        Ok(()) => {
            info!("Renamed: {} -> {}", src.display(), dst.display());
            report.renamed.push((src.to_path_buf(), dst.to_path_buf()));
        }
        Err(e) => {
            warn!("Failed to rename {} -> {}: {}", src.display(), dst.display(), e);
            report.missing_sources += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputConfig;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 4).unwrap()
    }

    #[test]
    fn test_date_prefix_dashed() {
        assert_eq!(
            date_prefix_from_stem("Screen Recording 2021-12-21 at 10.01", today()),
            "2021-12-21"
        );
    }

    #[test]
    fn test_date_prefix_compact() {
        assert_eq!(date_prefix_from_stem("rec_20211221_morning", today()), "2021-12-21");
    }

    #[test]
    fn test_date_prefix_fallback_to_today() {
        assert_eq!(date_prefix_from_stem("untitled recording", today()), "2026-08-04");
    }

    #[test]
    fn test_build_new_stem_with_prefix() {
        assert_eq!(
            build_new_stem("whatever", "therapy", "生活近況與工作壓力"),
            "therapy_生活近況與工作壓力"
        );
    }

    #[tokio::test]
    async fn test_safe_rename_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        tokio::fs::write(&src, "source").await.unwrap();
        tokio::fs::write(&dst, "existing").await.unwrap();

        let mut report = RenameReport::default();
        safe_rename(&src, &dst, &mut report).await;

        assert_eq!(report.skipped_collisions, 1);
        assert!(report.renamed.is_empty());
        assert_eq!(tokio::fs::read_to_string(&dst).await.unwrap(), "existing");
        assert!(src.exists());
    }

    #[tokio::test]
    async fn test_rename_with_summary_moves_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("standup 2024-05-02.mov");
        tokio::fs::write(&media, "video").await.unwrap();

        let outputs = OutputPaths::derive(&media, &OutputConfig::default());
        tokio::fs::write(&outputs.raw_transcript, "raw").await.unwrap();
        tokio::fs::write(&outputs.summary, "summary").await.unwrap();

        let report = rename_with_summary(&media, &outputs, "2024-05-02_sprint planning")
            .await
            .unwrap();

        // media + raw transcript + summary moved; clean transcript and srt missing
        assert_eq!(report.renamed.len(), 3);
        assert_eq!(report.missing_sources, 2);
        assert!(dir.path().join("2024-05-02_sprint planning.mov").exists());
        assert!(!media.exists());
    }
}
