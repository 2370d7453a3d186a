//! Rulebook document fetch, validation, conversion and analysis.
//!
//! Given a rulebook URL, [`fetch_rulebook`] downloads the document, checks
//! that it is a text format we can read, converts it to clean Markdown-ish
//! text and computes complexity metrics. PDFs and other binary formats are
//! rejected as unsupported.

mod analysis;
mod cleanup;
mod convert;

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use url::Url;

use boardshelf_shared::{BoardshelfError, ComplexityMetrics, Result, RulebookConfig};

pub use analysis::{analyse, extract_key_terms};
pub use convert::html_to_text;

/// User-Agent string for rulebook requests.
const USER_AGENT: &str = concat!("boardshelf/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Document formats the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    PlainText,
    Markdown,
}

/// Limits applied while fetching a rulebook.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout_secs: u64,
    pub max_bytes: u64,
    pub max_redirects: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&RulebookConfig::default())
    }
}

impl From<&RulebookConfig> for FetchOptions {
    fn from(config: &RulebookConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
            max_bytes: config.max_bytes,
            max_redirects: config.max_redirects,
        }
    }
}

/// A fetched and analysed rulebook.
#[derive(Debug, Clone)]
pub struct ParsedRulebook {
    /// URL the document was requested from.
    pub source_url: String,
    pub kind: DocumentKind,
    /// First heading of the document, when it has one.
    pub title: Option<String>,
    /// Cleaned structured text.
    pub text: String,
    pub complexity: ComplexityMetrics,
    /// Hex SHA-256 of `text`.
    pub content_hash: String,
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Fetch a rulebook document and turn it into structured text plus metrics.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_rulebook(url: &str, opts: &FetchOptions) -> Result<ParsedRulebook> {
    let parsed_url = validate_url(url)?;
    let client = build_client(opts)?;

    let (body, kind) = fetch_document(&client, &parsed_url, opts).await?;
    let rulebook = parse_document(url, &body, kind)?;

    info!(
        kind = ?rulebook.kind,
        words = rulebook.complexity.word_count,
        sections = rulebook.complexity.section_count,
        score = rulebook.complexity.score,
        "rulebook parsed"
    );

    Ok(rulebook)
}

/// Convert an already-downloaded document body into a [`ParsedRulebook`].
pub fn parse_document(source_url: &str, body: &str, kind: DocumentKind) -> Result<ParsedRulebook> {
    let text = match kind {
        DocumentKind::Html => convert::html_to_text(body)?,
        DocumentKind::PlainText | DocumentKind::Markdown => cleanup::run_pipeline(body),
    };

    if text.trim().is_empty() {
        return Err(BoardshelfError::parse(format!(
            "{source_url}: rulebook contains no readable text"
        )));
    }

    let complexity = analysis::analyse(&text);
    let title = convert::extract_title(&text);
    let content_hash = content_hash(&text);

    Ok(ParsedRulebook {
        source_url: source_url.to_string(),
        kind,
        title,
        text,
        complexity,
        content_hash,
    })
}

/// Hex SHA-256 digest of a text.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Only absolute http(s) URLs are fetched.
fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| BoardshelfError::validation(format!("invalid rulebook URL '{url}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(BoardshelfError::validation(format!(
            "unsupported rulebook URL scheme '{other}'"
        ))),
    }
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &FetchOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(opts.max_redirects))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| BoardshelfError::Network(format!("failed to build HTTP client: {e}")))
}

/// Fetch a URL and check status, size and content type.
async fn fetch_document(
    client: &Client,
    url: &Url,
    opts: &FetchOptions,
) -> Result<(String, DocumentKind)> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| BoardshelfError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(BoardshelfError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > opts.max_bytes {
            return Err(BoardshelfError::validation(format!(
                "{url}: rulebook too large ({len} bytes, max {})",
                opts.max_bytes
            )));
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let declared = match content_type.as_deref() {
        Some(ct) => Some(classify_content_type(url, ct)?),
        None => None,
    };

    let body = read_limited(response, url, opts.max_bytes).await?;

    let kind = match declared {
        Some(kind) => kind,
        None => sniff_kind(url, &body)?,
    };

    debug!(bytes = body.len(), ?kind, "rulebook downloaded");
    Ok((body, kind))
}

/// Read the body chunk by chunk, giving up as soon as it exceeds `max_bytes`.
///
/// Chunked responses carry no Content-Length, so the limit has to hold while
/// streaming rather than after the whole body is buffered.
async fn read_limited(
    mut response: reqwest::Response,
    url: &Url,
    max_bytes: u64,
) -> Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| BoardshelfError::Network(format!("{url}: failed to read body: {e}")))?
    {
        if u64::try_from(buf.len() + chunk.len()).unwrap_or(u64::MAX) > max_bytes {
            return Err(BoardshelfError::validation(format!(
                "{url}: rulebook too large (more than {max_bytes} bytes)"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Map a Content-Type header onto a supported document kind.
fn classify_content_type(url: &Url, content_type: &str) -> Result<DocumentKind> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => Ok(DocumentKind::Html),
        "text/markdown" | "text/x-markdown" => Ok(DocumentKind::Markdown),
        "text/plain" => Ok(DocumentKind::PlainText),
        "application/pdf" => Err(BoardshelfError::parse(format!(
            "{url}: PDF rulebooks are not supported"
        ))),
        other => Err(BoardshelfError::parse(format!(
            "{url}: unsupported rulebook content type '{other}'"
        ))),
    }
}

/// Guess the kind of a document served without a Content-Type.
fn sniff_kind(url: &Url, body: &str) -> Result<DocumentKind> {
    if body.starts_with("%PDF") || url.path().to_ascii_lowercase().ends_with(".pdf") {
        return Err(BoardshelfError::parse(format!(
            "{url}: PDF rulebooks are not supported"
        )));
    }

    let head = body.trim_start().get(..256).unwrap_or(body.trim_start());
    let head = head.to_ascii_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        Ok(DocumentKind::Html)
    } else if url.path().ends_with(".md") {
        Ok(DocumentKind::Markdown)
    } else {
        Ok(DocumentKind::PlainText)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES_HTML: &str = r#"<html><head><title>Azul</title></head><body>
        <nav><a href="/">Home</a></nav>
        <main>
          <h1>Azul Rules</h1>
          <h2>Setup</h2>
          <p>Give each player a board. Place the factory displays in a circle.</p>
          <h2>Gameplay</h2>
          <p>On your turn, pick all tiles of one color from a factory display.</p>
          <h2>Scoring</h2>
          <p>Score points for each tile placed on your wall.</p>
        </main>
        <footer>Copyright Plan B</footer>
    </body></html>"#;

    #[test]
    fn validate_url_rejects_other_schemes() {
        assert!(validate_url("https://example.com/rules.html").is_ok());
        assert!(validate_url("ftp://example.com/rules.txt").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn content_type_classification() {
        let url = Url::parse("https://example.com/rules").unwrap();
        assert_eq!(
            classify_content_type(&url, "text/html; charset=utf-8").unwrap(),
            DocumentKind::Html
        );
        assert_eq!(
            classify_content_type(&url, "text/markdown").unwrap(),
            DocumentKind::Markdown
        );
        let err = classify_content_type(&url, "application/pdf").unwrap_err();
        assert!(err.to_string().contains("PDF"));
        assert!(classify_content_type(&url, "image/png").is_err());
    }

    #[test]
    fn parse_document_from_html() {
        let parsed =
            parse_document("https://example.com/azul", RULES_HTML, DocumentKind::Html).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Azul Rules"));
        assert!(parsed.text.contains("factory displays"));
        assert!(!parsed.text.contains("Copyright Plan B"));
        assert_eq!(parsed.complexity.section_count, 4);
        assert_eq!(parsed.content_hash.len(), 64);
    }

    #[test]
    fn parse_document_rejects_empty_text() {
        let result = parse_document(
            "https://example.com/empty",
            "<html><body></body></html>",
            DocumentKind::Html,
        );
        assert!(result.is_err());
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }

    #[tokio::test]
    async fn fetch_html_rulebook_from_mock_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/azul.html"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(RULES_HTML),
            )
            .mount(&server)
            .await;

        let url = format!("{}/azul.html", server.uri());
        let parsed = fetch_rulebook(&url, &FetchOptions::default()).await.unwrap();

        assert_eq!(parsed.kind, DocumentKind::Html);
        assert_eq!(parsed.source_url, url);
        assert!(parsed.text.contains("## Gameplay"));
        assert!(parsed.complexity.word_count > 20);
    }

    #[tokio::test]
    async fn fetch_plain_text_rulebook() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/rules.txt"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("Each player draws five cards.\nHighest card wins.\n"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/rules.txt", server.uri());
        let parsed = fetch_rulebook(&url, &FetchOptions::default()).await.unwrap();
        assert_eq!(parsed.kind, DocumentKind::PlainText);
        assert!(parsed.text.contains("five cards"));
    }

    #[tokio::test]
    async fn fetch_rejects_pdf() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/rules.pdf"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.7 binary".to_vec()),
            )
            .mount(&server)
            .await;

        let url = format!("{}/rules.pdf", server.uri());
        let err = fetch_rulebook(&url, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BoardshelfError::Parse { .. }));
    }

    #[tokio::test]
    async fn fetch_reports_http_errors() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/missing.html"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing.html", server.uri());
        let err = fetch_rulebook(&url, &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BoardshelfError::Network(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn fetch_enforces_size_limit() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/huge.txt"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("word ".repeat(100)),
            )
            .mount(&server)
            .await;

        let opts = FetchOptions {
            max_bytes: 64,
            ..FetchOptions::default()
        };
        let url = format!("{}/huge.txt", server.uri());
        let err = fetch_rulebook(&url, &opts).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    /// Serve a single chunked response with no Content-Length header.
    async fn serve_chunked(chunks: Vec<String>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;

            let mut response = String::from(
                "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\n\
                 transfer-encoding: chunked\r\nconnection: close\r\n\r\n",
            );
            for chunk in &chunks {
                response.push_str(&format!("{:x}\r\n{chunk}\r\n", chunk.len()));
            }
            response.push_str("0\r\n\r\n");
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/rules.txt")
    }

    #[tokio::test]
    async fn fetch_reads_chunked_body_within_limit() {
        let url = serve_chunked(vec![
            "Each player draws five cards.\n".to_string(),
            "Highest card wins.\n".to_string(),
        ])
        .await;

        let parsed = fetch_rulebook(&url, &FetchOptions::default()).await.unwrap();
        assert_eq!(parsed.kind, DocumentKind::PlainText);
        assert!(parsed.text.contains("Highest card wins"));
    }

    #[tokio::test]
    async fn fetch_enforces_size_limit_without_content_length() {
        let url = serve_chunked(vec!["word ".repeat(20); 10]).await;

        let opts = FetchOptions {
            max_bytes: 64,
            ..FetchOptions::default()
        };
        let err = fetch_rulebook(&url, &opts).await.unwrap_err();
        assert!(matches!(err, BoardshelfError::Validation { .. }));
        assert!(err.to_string().contains("too large"));
    }
}
