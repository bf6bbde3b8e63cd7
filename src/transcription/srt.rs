use super::TranscriptLine;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// SubRip subtitle generation from speaker-attributed transcript lines.
#[derive(Debug, Clone, Default)]
pub struct SrtWriter {
    entries: Vec<TranscriptLine>,
}

impl SrtWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: &[TranscriptLine]) -> Self {
        let mut writer = Self::new();
        writer.entries.extend(lines.iter().cloned());
        writer
    }

    pub fn add_line(&mut self, line: TranscriptLine) {
        self.entries.push(line);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the SRT document: 1-based indices, `HH:MM:SS,mmm` timestamps,
    /// speaker-tagged text, blank line between entries.
    pub fn generate(&self) -> String {
        let mut srt = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let _ = write!(
                srt,
                "{}\n{} --> {}\nSpeaker {}: {}\n\n",
                i + 1,
                format_timestamp(entry.start),
                format_timestamp(entry.end),
                entry.speaker,
                entry.text
            );
        }
        srt
    }

    /// Save the rendered subtitles to a file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        tokio::fs::write(path.as_ref(), self.generate()).await?;
        info!("SRT subtitles saved to: {}", path.as_ref().display());
        Ok(())
    }
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`)
fn format_timestamp(seconds: f64) -> String {
    let whole = seconds.max(0.0) as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    let millis = ((seconds.max(0.0) - whole as f64) * 1000.0).round() as u64;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis.min(999))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(speaker: &str, start: f64, end: f64, text: &str) -> TranscriptLine {
        TranscriptLine {
            speaker: speaker.to_string(),
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(61.5), "00:01:01,500");
        assert_eq!(format_timestamp(3725.042), "01:02:05,042");
    }

    #[test]
    fn test_generate_srt() {
        let writer = SrtWriter::from_lines(&[
            line("00", 0.5, 2.0, "hello everyone"),
            line("01", 2.5, 4.25, "hi"),
        ]);

        let srt = writer.generate();
        let expected = "1\n00:00:00,500 --> 00:00:02,000\nSpeaker 00: hello everyone\n\n\
                        2\n00:00:02,500 --> 00:00:04,250\nSpeaker 01: hi\n\n";
        assert_eq!(srt, expected);
    }

    #[test]
    fn test_empty_writer() {
        let writer = SrtWriter::new();
        assert!(writer.is_empty());
        assert_eq!(writer.generate(), "");
    }

    #[test]
    fn test_add_line() {
        let mut writer = SrtWriter::new();
        writer.add_line(line("00", 0.0, 1.0, "hey"));
        assert_eq!(writer.len(), 1);
        assert!(!writer.is_empty());
    }
}
