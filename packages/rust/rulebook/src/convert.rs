//! HTML-to-text conversion for rulebook pages.
//!
//! Extracts the content region of an HTML page, turns tables into Markdown
//! tables, converts the rest with `htmd` and runs the cleanup passes.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use boardshelf_shared::{BoardshelfError, Result};

use crate::cleanup;

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static TH_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("valid selector"));
static TD_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("valid selector"));

/// Convert a rulebook HTML page to cleaned Markdown text.
pub fn html_to_text(html: &str) -> Result<String> {
    let content_html = extract_content_html(html);
    let content_html = preprocess_tables(&content_html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "script", "style", "nav", "header", "footer", "iframe", "noscript", "svg", "img",
        ])
        .build();

    let raw = converter
        .convert(&content_html)
        .map_err(|e| BoardshelfError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw.len(), "htmd conversion complete");
    Ok(cleanup::run_pipeline(&raw))
}

/// Extract title from the first H1 in the converted text.
pub(crate) fn extract_title(text: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(text).map(|c| c[1].trim().to_string())
}

/// Extract the main content HTML, stripping page chrome.
fn extract_content_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    // Known content containers in priority order
    let selectors = [
        ".rulebook",
        "[role=\"main\"]",
        "article",
        "main",
        ".content",
        "body",
    ];

    for sel_str in &selectors {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                return el.inner_html();
            }
        }
    }

    html.to_string()
}

/// Rewrite `<table>` elements as Markdown tables before conversion.
///
/// Component and scoring tables are common in rulebooks and `htmd` does not
/// render tables itself.
fn preprocess_tables(html: &str) -> String {
    let doc = Html::parse_fragment(html);

    if doc.select(&TABLE_SEL).next().is_none() {
        return html.to_string();
    }

    let mut result = html.to_string();
    for table in doc.select(&TABLE_SEL) {
        let md_table = table_to_markdown(&table);
        result = result.replacen(&table.html(), &md_table, 1);
    }
    result
}

fn table_to_markdown(table: &ElementRef) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut has_header = false;

    for tr in table.select(&TR_SEL) {
        let cells: Vec<String> = tr
            .select(&TH_SEL)
            .map(|cell| cell_text(&cell))
            .collect();
        if !cells.is_empty() {
            has_header = true;
            rows.push(cells);
            continue;
        }

        let cells: Vec<String> = tr
            .select(&TD_SEL)
            .map(|cell| cell_text(&cell))
            .collect();
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
    if col_count == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(col_count, String::new());
    }

    let mut md = String::from("\n\n");
    let push_row = |md: &mut String, row: &[String]| {
        md.push_str("| ");
        md.push_str(&row.join(" | "));
        md.push_str(" |\n");
    };

    push_row(&mut md, &rows[0]);
    md.push_str("| ");
    md.push_str(&vec!["---"; col_count].join(" | "));
    md.push_str(" |\n");

    let data_start = usize::from(has_header);
    for row in &rows[data_start..] {
        push_row(&mut md, row);
    }

    md.push('\n');
    md
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}
