pub mod srt;
pub mod whisper;

pub use srt::SrtWriter;
pub use whisper::WhisperTranscriber;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// One speaker-attributed line of the raw transcript.
///
/// Serialized form: `Speaker N: [S.SS-E.EE] text`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptLine {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Speaker {}: [{:.2}-{:.2}] {}",
            self.speaker, self.start, self.end, self.text
        )
    }
}

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^Speaker (\S+): \[(\d+(?:\.\d+)?)-(\d+(?:\.\d+)?)\] (.+)$")
            .expect("transcript line regex")
    })
}

impl TranscriptLine {
    /// Parse one raw transcript line; non-matching lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let captures = line_regex().captures(line.trim())?;
        Some(Self {
            speaker: captures[1].to_string(),
            start: captures[2].parse().ok()?,
            end: captures[3].parse().ok()?,
            text: captures[4].to_string(),
        })
    }
}

/// Parse a raw transcript file back into lines, skipping anything that does
/// not match the format.
pub fn parse_transcript(text: &str) -> Vec<TranscriptLine> {
    text.lines().filter_map(TranscriptLine::parse).collect()
}

/// Render transcript lines into the raw transcript file format.
pub fn format_transcript(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_round_trip() {
        let line = TranscriptLine {
            speaker: "00".to_string(),
            start: 12.5,
            end: 17.82,
            text: "we should ship on friday".to_string(),
        };
        let rendered = line.to_string();
        assert_eq!(rendered, "Speaker 00: [12.50-17.82] we should ship on friday");
        assert_eq!(TranscriptLine::parse(&rendered), Some(line));
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let text = "Speaker 00: [0.00-1.00] hello\n\ngarbage line\nSpeaker 01: [1.50-2.00] hi";
        let lines = parse_transcript(text);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].speaker, "01");
    }

    #[test]
    fn test_format_transcript() {
        let lines = vec![
            TranscriptLine {
                speaker: "00".to_string(),
                start: 0.0,
                end: 1.5,
                text: "hello".to_string(),
            },
            TranscriptLine {
                speaker: "01".to_string(),
                start: 1.5,
                end: 2.0,
                text: "hi".to_string(),
            },
        ];
        let text = format_transcript(&lines);
        assert_eq!(parse_transcript(&text), lines);
    }
}
