//! Text utilities applied around generation: cleaning, signatures, filler removal.

use regex::Regex;
use std::sync::LazyLock;

/// Pure text helpers used by the bot and the model.
pub trait Formatter: Send + Sync + 'static {
    /// Strip platform markup and normalize whitespace. Trailing periods are
    /// removed unless `keep_periods` is set.
    fn clean(&self, text: &str, keep_periods: bool) -> String;

    /// Append the bot's signature.
    fn append_suffix(&self, text: &str) -> String;

    /// Drop words that make poor generation seeds.
    fn remove_filler_words(&self, words: Vec<String>) -> Vec<String>;

    /// Append a period unless the text already ends a sentence.
    fn ensure_terminal_punctuation(&self, text: &str) -> String;

    /// Render a duration as `M:SS`.
    fn duration_to_text(&self, minutes: f64) -> String;
}

/// Words too common to steer a reply toward the message's topic.
const FILLER_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "if", "then", "so", "to", "of", "in", "on", "at",
    "for", "from", "with", "by", "is", "are", "was", "were", "be", "been", "being", "it",
    "this", "that", "these", "those", "i", "you", "he", "she", "we", "they", "me", "him",
    "her", "us", "them", "my", "your", "his", "its", "our", "their", "as", "not", "no",
    "yes", "do", "does", "did", "have", "has", "had", "will", "would", "can", "could",
    "should", "may", "might", "im", "just", "like", "what", "why", "how", "lol",
];

const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', '…'];

static MARKUP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // user, role and channel mentions
        Regex::new(r"<(@[!&]?|#)\d+>").expect("hardcoded regex"),
        // custom emoji
        Regex::new(r"<a?:\w+:\d+>").expect("hardcoded regex"),
        Regex::new(r"https?://\S+").expect("hardcoded regex"),
        Regex::new(r"@(everyone|here)\b").expect("hardcoded regex"),
    ]
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex"));

/// Default formatter.
#[derive(Debug, Clone, Default)]
pub struct TakeFormatter {
    suffix: String,
}

impl TakeFormatter {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl Formatter for TakeFormatter {
    fn clean(&self, text: &str, keep_periods: bool) -> String {
        let mut cleaned = text.to_string();
        for pattern in MARKUP_PATTERNS.iter() {
            cleaned = pattern.replace_all(&cleaned, " ").into_owned();
        }

        let cleaned = WHITESPACE.replace_all(cleaned.trim(), " ");

        if keep_periods {
            cleaned.into_owned()
        } else {
            cleaned.trim_end_matches('.').trim_end().to_string()
        }
    }

    fn append_suffix(&self, text: &str) -> String {
        if self.suffix.is_empty() {
            text.to_string()
        } else {
            format!("{text} {}", self.suffix)
        }
    }

    fn remove_filler_words(&self, words: Vec<String>) -> Vec<String> {
        words
            .into_iter()
            .filter(|word| {
                let bare: String = word
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .flat_map(char::to_lowercase)
                    .collect();
                !bare.is_empty() && !FILLER_WORDS.contains(&bare.as_str())
            })
            .collect()
    }

    fn ensure_terminal_punctuation(&self, text: &str) -> String {
        let trimmed = text.trim_end();
        match trimmed.chars().last() {
            None => String::new(),
            Some(last) if TERMINAL_PUNCTUATION.contains(&last) => trimmed.to_string(),
            Some(_) => format!("{trimmed}."),
        }
    }

    fn duration_to_text(&self, minutes: f64) -> String {
        let total_secs = if minutes.is_finite() {
            (minutes * 60.0).max(0.0).floor() as u64
        } else {
            0
        };
        format!("{}:{:02}", total_secs / 60, total_secs % 60)
    }
}
