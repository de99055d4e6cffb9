//! Abstract synopsis extraction.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::NO_ABSTRACT;

/// Default word cap for synopses in the compact table
pub const SUMMARY_MAX_WORDS: usize = 70;

const MAX_SENTENCES: usize = 3;

fn sentence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"))
}

/// Condense an abstract to at most three leading sentences and
/// `max_words` words.
///
/// Sentences are added while the running word count stays within the cap.
/// When the first sentence alone is too long, its first `max_words` words
/// are returned followed by `...`.
pub fn extract_summary(abstract_text: &str, max_words: usize) -> String {
    let text = abstract_text.trim();
    if text.is_empty() || text == NO_ABSTRACT {
        return "No abstract available".to_string();
    }

    let sentences: Vec<&str> = sentence_regex()
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut picked: Vec<String> = Vec::new();
    let mut word_count = 0;

    for sentence in sentences.iter().take(MAX_SENTENCES) {
        let words = sentence.split_whitespace().count();
        if word_count + words > max_words {
            break;
        }
        let body = sentence.trim_end_matches(['.', '!', '?']);
        if body.is_empty() {
            continue;
        }
        picked.push(format!("{}.", body));
        word_count += words;
    }

    if picked.is_empty() {
        let first = sentences.first().copied().unwrap_or(text);
        let words: Vec<&str> = first.split_whitespace().take(max_words).collect();
        return format!("{}...", words.join(" "));
    }

    picked.join(" ")
}
