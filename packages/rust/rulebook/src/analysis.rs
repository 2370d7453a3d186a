//! Complexity metrics and key-term extraction over converted rulebook text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use boardshelf_shared::ComplexityMetrics;

/// Average silent reading speed used for the reading-time estimate.
const WORDS_PER_MINUTE: usize = 200;

/// Words that usually introduce a rules exception or a special case.
static EXCEPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:unless|except|instead|however|optional|variant|exception)\b")
        .expect("valid regex")
});

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,6})\s+(.+?)\s*$").expect("valid regex"));

/// Compute complexity metrics for a rulebook.
pub fn analyse(text: &str) -> ComplexityMetrics {
    let word_count = text
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count();

    let headings = HEADING_RE.find_iter(text).count();
    let section_count = if headings == 0 && word_count > 0 {
        1
    } else {
        headings
    };

    let reading_minutes = word_count.div_ceil(WORDS_PER_MINUTE) as u32;

    let exceptions = EXCEPTION_RE.find_iter(text).count();
    let exception_density = if word_count == 0 {
        0.0
    } else {
        exceptions as f32 * 1000.0 / word_count as f32
    };

    let length_factor = (word_count as f32 / 1500.0).min(2.5);
    let section_factor = (section_count as f32 / 10.0).min(1.0);
    let exception_factor = (exception_density / 10.0).min(0.5);
    let raw = 1.0 + length_factor + section_factor + exception_factor;
    let score = (raw.clamp(1.0, 5.0) * 10.0).round() / 10.0;

    ComplexityMetrics {
        word_count,
        section_count,
        reading_minutes,
        score,
    }
}

/// Terms a rulebook emphasises: bold phrases and sub-section headings, in
/// order of first appearance, at most `limit`.
pub fn extract_key_terms(text: &str, limit: usize) -> Vec<String> {
    static BOLD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\*\*([^*\n]{2,40})\*\*").expect("valid regex"));

    let mut candidates: Vec<(usize, String)> = Vec::new();

    for caps in HEADING_RE.captures_iter(text) {
        if caps[1].len() >= 2 {
            if let Some(m) = caps.get(2) {
                candidates.push((m.start(), m.as_str().to_string()));
            }
        }
    }
    for caps in BOLD_RE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            candidates.push((m.start(), m.as_str().trim().to_string()));
        }
    }
    candidates.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|(_, term)| term.trim_end_matches(':').trim().to_string())
        .filter(|term| !term.is_empty() && seen.insert(term.to_lowercase()))
        .take(limit)
        .collect()
}
