use serde::{Deserialize, Serialize};

/// Languages the pipeline selects prompts and transcription hints for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Language {
    English,
    Chinese,
}

impl Language {
    /// ISO 639-1 code used for whisper language hints.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
        }
    }

    /// Parse a CLI language code. Unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        if code.eq_ignore_ascii_case("zh") {
            Language::Chinese
        } else {
            Language::English
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

/// Ratio of CJK characters above which text is classified as Chinese.
const CJK_RATIO_THRESHOLD: f64 = 0.3;

/// Detect the dominant language of a text by character ranges.
///
/// Counts CJK Unified Ideographs (U+4E00..U+9FFF) against all alphabetic
/// characters. Text with no alphabetic content is treated as English.
pub fn detect(text: &str) -> Language {
    let mut cjk = 0usize;
    let mut alphabetic = 0usize;

    for ch in text.chars() {
        if ('\u{4e00}'..='\u{9fff}').contains(&ch) {
            cjk += 1;
            alphabetic += 1;
        } else if ch.is_alphabetic() {
            alphabetic += 1;
        }
    }

    if alphabetic == 0 {
        return Language::English;
    }

    if cjk as f64 / alphabetic as f64 > CJK_RATIO_THRESHOLD {
        Language::Chinese
    } else {
        Language::English
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_english() {
        assert_eq!(detect("let's go over the quarterly numbers"), Language::English);
    }

    #[test]
    fn test_detect_chinese() {
        assert_eq!(detect("今天我們來討論一下這個季度的數字"), Language::Chinese);
    }

    #[test]
    fn test_detect_mixed_below_threshold() {
        // Two CJK chars against a long English sentence stays English
        let text = "the quarterly report mentioned 數字 twice in passing today";
        assert_eq!(detect(text), Language::English);
    }

    #[test]
    fn test_detect_mixed_above_threshold() {
        let text = "今天開會討論 roadmap 還有 budget";
        assert_eq!(detect(text), Language::Chinese);
    }

    #[test]
    fn test_detect_empty_and_symbols() {
        assert_eq!(detect(""), Language::English);
        assert_eq!(detect("12:34 --> 56:78 ..."), Language::English);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("zh"), Language::Chinese);
        assert_eq!(Language::from_code("ZH"), Language::Chinese);
        assert_eq!(Language::from_code("en"), Language::English);
        assert_eq!(Language::from_code("fr"), Language::English);
    }
}
