/// Recording Scribe
///
/// Batch transcription and summarization pipeline for meeting and voice
/// recordings. Converts media to transcription-ready audio, delegates
/// speaker diarization and speech-to-text to external tools, and uses a
/// chat-completion API to refine transcripts, summarize them, and derive
/// new filenames.

pub mod audio;
pub mod config;
pub mod diarization;
pub mod language;
pub mod llm;
pub mod pipeline;
pub mod rename;
pub mod transcription;
pub mod video;

// Re-export main types for easy access
pub use crate::audio::{AudioConverter, AudioInfo};
pub use crate::config::Config;
pub use crate::diarization::{Diarizer, SpeakerTurn};
pub use crate::language::Language;
pub use crate::llm::refine::Refiner;
pub use crate::llm::retry::RetrySchedule;
pub use crate::pipeline::{BatchReport, FileOutcome, PipelineOptions, RecordingPipeline};
pub use crate::transcription::{TranscriptLine, WhisperTranscriber};
pub use crate::video::{VideoDownscaler, VideoInfo};
