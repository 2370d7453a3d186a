//! Cleanup passes applied to converted rulebook text.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on converted text.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = normalize_line_endings(text);

    result = normalize_headings(&result);
    result = strip_leftover_html(&result);
    result = drop_page_markers(&result);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Keep a single H1; later H1s become H2.
fn normalize_headings(text: &str) -> String {
    static H_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex"));

    let mut seen_h1 = false;
    text.lines()
        .map(|line| match H_RE.captures(line) {
            Some(caps) if &caps[1] == "#" => {
                if seen_h1 {
                    format!("## {}", &caps[2])
                } else {
                    seen_h1 = true;
                    line.to_string()
                }
            }
            _ => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Stray markup
// ---------------------------------------------------------------------------

/// Remove container tags that survived conversion, keeping their text.
fn strip_leftover_html(text: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|aside|figure|figcaption|details|summary|font|center)(?:\s[^>]*)?>")
            .expect("valid regex")
    });

    HTML_TAG_RE.replace_all(text, "").to_string()
}

/// Drop bare page-number lines ("12", "Page 3", "- 4 -") left by exported rulebooks.
fn drop_page_markers(text: &str) -> String {
    static PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\s*(?:page\s+)?[-–]?\s*\d{1,3}\s*[-–]?\s*$").expect("valid regex")
    });

    text.lines()
        .filter(|line| !PAGE_RE.is_match(&line.to_lowercase()))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of blank lines into one.
fn clean_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE
        .replace_all(text.trim_start_matches('\n'), "\n\n")
        .to_string()
}

fn ensure_trailing_newline(text: &str) -> String {
    let trimmed = text.trim_end_matches('\n');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{trimmed}\n")
}
