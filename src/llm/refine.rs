use super::retry::{chat_or_fallback, RetrySchedule};
use super::{create_llm, ChatMessage, ChatRequest, Llm};
use crate::config::LlmConfig;
use crate::language::{self, Language};
use anyhow::Result;
use tracing::{debug, info};

/// Transcript refinement, summarization and filename generation via the
/// chat-completion API.
///
/// Every call goes through the escalating-timeout retry wrapper: a refused
/// or timed-out request degrades to a fallback value instead of failing the
/// pipeline.
pub struct Refiner {
    llm: Box<dyn Llm>,
    refine_model: String,
    summary_model: String,
    filename_model: String,
    temperature: f32,
    max_chunk_chars: usize,
    refine_schedule: RetrySchedule,
    summary_schedule: RetrySchedule,
    filename_schedule: RetrySchedule,
}

impl Refiner {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let llm = create_llm(config)?;
        Ok(Self::with_llm(llm, config))
    }

    /// Build a refiner around an existing backend (used by tests).
    pub fn with_llm(llm: Box<dyn Llm>, config: &LlmConfig) -> Self {
        Self {
            llm,
            refine_model: config.refine_model.clone(),
            summary_model: config.summary_model.clone(),
            filename_model: config.filename_model.clone(),
            temperature: config.temperature,
            max_chunk_chars: config.max_chunk_chars,
            refine_schedule: RetrySchedule::from_secs(&config.refine_timeouts_secs),
            summary_schedule: RetrySchedule::from_secs(&config.summary_timeouts_secs),
            filename_schedule: RetrySchedule::from_secs(&config.filename_timeouts_secs),
        }
    }

    /// Clean up a raw transcript: punctuation, filler removal, typo fixes.
    ///
    /// Long transcripts are split into character-bounded chunks so a single
    /// request stays within what the API handles before timing out. A chunk
    /// whose refinement fails is kept verbatim.
    pub async fn refine_transcript(&self, raw: &str) -> String {
        let chunks = chunk_text(raw, self.max_chunk_chars);
        if chunks.len() > 1 {
            info!(
                "Transcript is long ({} chars), refining in {} chunks",
                raw.chars().count(),
                chunks.len()
            );
        }

        let mut refined = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            debug!("Refining chunk {} of {}", i + 1, chunks.len());
            let lang = language::detect(chunk);
            let request = ChatRequest {
                model: self.refine_model.clone(),
                messages: vec![
                    ChatMessage::system(refine_system_prompt(lang)),
                    ChatMessage::user(refine_prompt(lang, chunk)),
                ],
                temperature: self.temperature,
            };
            let cleaned = chat_or_fallback(
                self.llm.as_ref(),
                &request,
                &self.refine_schedule,
                chunk,
                "transcript refinement",
            )
            .await;
            refined.push(cleaned);
        }

        refined.join("\n\n")
    }

    /// Generate a long-form summary of a refined transcript.
    pub async fn summarize(&self, transcript: &str) -> String {
        let lang = language::detect(transcript);
        let request = ChatRequest {
            model: self.summary_model.clone(),
            messages: vec![
                ChatMessage::system(summary_system_prompt(lang)),
                ChatMessage::user(summary_prompt(lang, transcript)),
            ],
            temperature: self.temperature,
        };
        let fallback = format!(
            "Summary of transcript with {} characters.",
            transcript.chars().count()
        );
        chat_or_fallback(
            self.llm.as_ref(),
            &request,
            &self.summary_schedule,
            &fallback,
            "summary generation",
        )
        .await
    }

    /// Generate a short, filesystem-safe phrase describing the recording.
    pub async fn filename_summary(&self, summary: &str) -> String {
        let lang = language::detect(summary);
        let request = ChatRequest {
            model: self.filename_model.clone(),
            messages: vec![
                ChatMessage::system(
                    "You are an assistant that generates concise file names from transcripts.",
                ),
                ChatMessage::user(filename_prompt(lang, summary)),
            ],
            temperature: self.temperature,
        };
        let raw = chat_or_fallback(
            self.llm.as_ref(),
            &request,
            &self.filename_schedule,
            "conversation",
            "filename generation",
        )
        .await;

        let sanitized = sanitize_filename(&raw);
        if sanitized.is_empty() {
            "conversation".to_string()
        } else {
            sanitized
        }
    }
}

/// Split text into chunks of at most `max_chars` characters, respecting
/// UTF-8 boundaries.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Strip characters that are unsafe in filenames on common filesystems.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' | '\n' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn refine_system_prompt(lang: Language) -> &'static str {
    match lang {
        Language::Chinese => "你是一個優秀的中文逐字稿修飾助手。",
        Language::English => {
            "You are an excellent transcript cleanup assistant. \
             Add correct punctuation and remove filler words with minimal changes."
        }
    }
}

fn refine_prompt(lang: Language, chunk: &str) -> String {
    match lang {
        Language::Chinese => format!(
            "請修飾下面的逐字稿：\n\
             - 盡量保留原意\n\
             - 去除贅字\n\
             - 加上正確的標點符號\n\
             - 修正常見錯字（例如：錯別字、同音字、口誤導致的打錯字）\n\
             ---\n{}\n",
            chunk
        ),
        Language::English => format!(
            "Please clean up the following transcript:\n\
             - Keep the original meaning\n\
             - Remove filler words\n\
             - Add correct punctuation\n\
             - Fix common typos and spelling errors\n\
             ---\n{}\n",
            chunk
        ),
    }
}

fn summary_system_prompt(lang: Language) -> &'static str {
    match lang {
        Language::Chinese => "你是一位會議談話內容摘要助手。",
        Language::English => "You are an assistant that summarizes meetings.",
    }
}

fn summary_prompt(lang: Language, transcript: &str) -> String {
    match lang {
        Language::Chinese => format!(
            "請根據下面的逐字稿，寫一段1000字以內的摘要\
             （用字自然，重點條列，請把人物名稱標注在內，\
             修正常見錯別字、類似音的字），繁體中文：\n\
             ---\n{}\n",
            transcript
        ),
        Language::English => format!(
            "Summarize the main points of the following transcript in less \
             than 1000 words (bullet points preferred). Include participant \
             names where they are mentioned:\n\
             ---\n{}\n",
            transcript
        ),
    }
}

fn filename_prompt(lang: Language, summary: &str) -> String {
    match lang {
        Language::Chinese => format!(
            "根據下面的摘要，請給我一句話摘要，適合作為檔案名稱\
             （盡量包含主題、重要事件或主要人物），請保持在30個字以內，\
             不要包含任何前綴，只需主題內容：\n\
             ---\n{}\n",
            summary
        ),
        Language::English => format!(
            "Based on the following summary, generate a short phrase (max 10 \
             words) suitable as a filename (preferably including the topic, \
             key event, or participants). Do not include any prefix, output \
             only the topic:\n\
             ---\n{}\n",
            summary
        ),
    }
}
