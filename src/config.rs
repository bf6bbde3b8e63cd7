use crate::llm::LlmProvider;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the recording transcription pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Media discovery settings
    pub processing: ProcessingConfig,

    /// Audio conversion settings
    pub audio: AudioConfig,

    /// Speaker diarization helper settings
    pub diarization: DiarizationConfig,

    /// Speech-to-text settings
    pub transcription: TranscriptionConfig,

    /// Chat-completion API settings
    pub llm: LlmConfig,

    /// Output file naming
    pub output: OutputConfig,

    /// Video downscale settings
    pub downscale: DownscaleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Supported media file extensions for batch discovery
    pub supported_extensions: Vec<String>,

    /// Descend into subdirectories when discovering media files
    pub recursive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate for transcription audio
    pub target_sample_rate: u32,

    /// Keep the intermediate mono WAV instead of deleting it
    pub keep_intermediate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizationConfig {
    /// External diarization helper command
    pub helper_command: String,

    /// Pretrained diarization pipeline identifier passed to the helper
    pub model: String,

    /// Hugging Face access token for the pretrained pipeline
    pub hf_token: Option<String>,

    /// Timeout for the helper process (seconds)
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Whisper CLI command (whisper.cpp style)
    pub whisper_command: String,

    /// Path to the whisper model file
    pub model_path: PathBuf,

    /// Timeout per transcribed segment (seconds)
    pub timeout_seconds: u64,

    /// Worker threads passed to the whisper CLI
    pub threads: u32,
}

/// Chat-completion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider to use
    pub provider: LlmProvider,

    /// Endpoint for OpenAI-compatible local servers
    pub endpoint: Option<String>,

    /// API key for hosted providers
    pub api_key: Option<String>,

    /// Model for transcript refinement
    pub refine_model: String,

    /// Model for summary generation
    pub summary_model: String,

    /// Model for filename generation
    pub filename_model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_seconds: u64,

    /// Maximum characters per refinement request
    pub max_chunk_chars: usize,

    /// Escalating per-attempt timeouts for refinement calls (seconds)
    pub refine_timeouts_secs: Vec<u64>,

    /// Escalating per-attempt timeouts for summary calls (seconds)
    pub summary_timeouts_secs: Vec<u64>,

    /// Per-attempt timeouts for filename generation calls (seconds)
    pub filename_timeouts_secs: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Suffix appended to the input stem for the raw transcript
    pub raw_transcript_suffix: String,

    /// Suffix for the refined transcript
    pub clean_transcript_suffix: String,

    /// Suffix for the summary
    pub summary_suffix: String,

    /// Suffix for the subtitle file
    pub srt_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownscaleConfig {
    /// Only downscale files larger than this (bytes)
    pub size_threshold_bytes: u64,

    /// Target width
    pub width: u32,

    /// Target height
    pub height: u32,

    /// x264 constant rate factor
    pub crf: u32,
}

impl Config {
    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "recording-scribe.toml",
            "config/recording-scribe.toml",
            "~/.config/recording-scribe/config.toml",
        ];

        let mut config: Option<Self> = None;
        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(parsed) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config = Some(parsed);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        let mut config = config.unwrap_or_default();
        config.apply_env();
        Ok(config)
    }

    /// Apply credential and override environment variables.
    ///
    /// Secrets are expected in the environment rather than the TOML file.
    pub fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.is_empty() {
                self.llm.api_key = Some(api_key);
            }
        }

        if let Ok(token) = std::env::var("HF_TOKEN") {
            if !token.is_empty() {
                self.diarization.hf_token = Some(token);
            }
        }

        if let Ok(endpoint) = std::env::var("SCRIBE_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
            self.llm.provider = LlmProvider::LmStudio;
        }

        if let Ok(model) = std::env::var("SCRIBE_WHISPER_MODEL") {
            self.transcription.model_path = PathBuf::from(model);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.audio.target_sample_rate == 0 {
            return Err(anyhow!("target_sample_rate must be greater than 0"));
        }

        if self.processing.supported_extensions.is_empty() {
            return Err(anyhow!("supported_extensions must not be empty"));
        }

        for (name, schedule) in [
            ("refine_timeouts_secs", &self.llm.refine_timeouts_secs),
            ("summary_timeouts_secs", &self.llm.summary_timeouts_secs),
            ("filename_timeouts_secs", &self.llm.filename_timeouts_secs),
        ] {
            if schedule.windows(2).any(|w| w[1] < w[0]) {
                return Err(anyhow!("{} must be non-decreasing", name));
            }
        }

        match self.llm.provider {
            LlmProvider::OpenAi => {
                if self.llm.api_key.is_none() {
                    return Err(anyhow!(
                        "OpenAI API key required (set OPENAI_API_KEY or llm.api_key)"
                    ));
                }
            }
            LlmProvider::LmStudio => {
                if self.llm.endpoint.is_none() {
                    return Err(anyhow!("llm.endpoint required for the LM Studio provider"));
                }
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processing: ProcessingConfig {
                supported_extensions: vec![
                    "mov".to_string(),
                    "mp4".to_string(),
                    "m4a".to_string(),
                    "mp3".to_string(),
                    "wav".to_string(),
                ],
                recursive: false,
            },
            audio: AudioConfig {
                target_sample_rate: 16000, // Optimal for Whisper
                keep_intermediate: false,
            },
            diarization: DiarizationConfig {
                helper_command: "pyannote-diarize".to_string(),
                model: "pyannote/speaker-diarization-3.1".to_string(),
                hf_token: None,
                timeout_seconds: 3600,
            },
            transcription: TranscriptionConfig {
                whisper_command: "whisper-cli".to_string(),
                model_path: PathBuf::from("models/ggml-large-v3.bin"),
                timeout_seconds: 600,
                threads: 4,
            },
            llm: LlmConfig::default(),
            output: OutputConfig::default(),
            downscale: DownscaleConfig {
                size_threshold_bytes: 3 * 1024 * 1024 * 1024, // 3 GiB
                width: 640,
                height: 480,
                crf: 23,
            },
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_transcript_suffix: ".speakers.raw_transcript.txt".to_string(),
            clean_transcript_suffix: ".speakers.clean_transcript.txt".to_string(),
            summary_suffix: ".speakers.summary.txt".to_string(),
            srt_suffix: ".srt".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAi,
            endpoint: None,
            api_key: None,
            refine_model: "gpt-4.1-mini".to_string(),
            summary_model: "gpt-4o".to_string(),
            filename_model: "gpt-4o".to_string(),
            temperature: 0.2,
            connect_timeout_seconds: 30,
            max_chunk_chars: 6000,
            refine_timeouts_secs: vec![120, 180, 240],
            summary_timeouts_secs: vec![180, 240, 300],
            filename_timeouts_secs: vec![60],
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.config.llm.provider = provider;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.llm.api_key = Some(api_key);
        self
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.config.llm.endpoint = Some(endpoint);
        self
    }

    pub fn with_whisper_command(mut self, command: String) -> Self {
        self.config.transcription.whisper_command = command;
        self
    }

    pub fn with_diarization_helper(mut self, command: String) -> Self {
        self.config.diarization.helper_command = command;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
