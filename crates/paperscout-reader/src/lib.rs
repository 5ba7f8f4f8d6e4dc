//! Download a paper and turn it into plain text.
//!
//! [`PaperReader`] implements [`PaperFetch`]: it validates the URL, downloads
//! the document with retries, hands the bytes to a [`DocumentBackend`] and
//! joins the page texts with blank lines.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use paperscout_core::{BackendError, Config, DocumentBackend, FetchOutcome, PaperFetch};

pub mod outline;

pub use outline::{Outline, OutlineSection, SectionKind, outline};

const USER_AGENT: &str = concat!("paperscout/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("invalid content type: {0}")]
    ContentType(String),
    #[error("empty document body")]
    EmptyBody,
    #[error("document has no pages")]
    NoPages,
    #[error("no text extracted from any page")]
    NoText,
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ReaderError {
    /// Transport and HTTP status failures are worth another attempt; a
    /// response that is not a PDF will not become one.
    fn is_retryable(&self) -> bool {
        matches!(self, ReaderError::Request(_) | ReaderError::Status(_))
    }
}

/// Check that `url` has a scheme and a host. A missing `.pdf` suffix only warns.
pub fn validate_url(url: &str) -> Result<reqwest::Url, ReaderError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| {
        tracing::error!(url, error = %e, "invalid URL format");
        ReaderError::InvalidUrl(url.to_string())
    })?;
    if parsed.host_str().is_none_or(str::is_empty) {
        tracing::error!(url, "URL has no host");
        return Err(ReaderError::InvalidUrl(url.to_string()));
    }
    if !url.to_lowercase().ends_with(".pdf") {
        tracing::warn!(url, "URL does not end with .pdf");
    }
    Ok(parsed)
}

/// Reject responses whose `Content-Type` is not `application/pdf`.
pub fn check_content_type(resp: &reqwest::Response) -> Result<(), ReaderError> {
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    if content_type.contains("application/pdf") {
        Ok(())
    } else {
        Err(ReaderError::ContentType(content_type))
    }
}

/// Join non-empty page texts with a blank line.
pub fn join_pages(pages: &[String]) -> Result<String, ReaderError> {
    if pages.is_empty() {
        tracing::error!("document has no pages");
        return Err(ReaderError::NoPages);
    }

    let mut kept = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        if page.trim().is_empty() {
            tracing::warn!(page = i + 1, "no text extracted from page");
        } else {
            tracing::debug!(page = i + 1, chars = page.chars().count(), "extracted page text");
            kept.push(page.as_str());
        }
    }

    let text = kept.join("\n\n").trim().to_string();
    if text.is_empty() {
        tracing::error!("no text extracted from any pages");
        return Err(ReaderError::NoText);
    }
    Ok(text)
}

/// Downloads documents and extracts their text.
pub struct PaperReader {
    client: reqwest::Client,
    backend: Arc<dyn DocumentBackend>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl PaperReader {
    pub fn new(config: &Config, backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            client: reqwest::Client::new(),
            backend,
            timeout: config.pdf_timeout,
            max_retries: config.max_download_retries.max(1),
            retry_delay: config.retry_delay,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn attempt(&self, url: &reqwest::Url) -> Result<Vec<u8>, ReaderError> {
        let resp = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ReaderError::Status(resp.status().as_u16()));
        }
        check_content_type(&resp)?;

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(ReaderError::EmptyBody);
        }
        Ok(bytes.to_vec())
    }

    /// Download `url`, retrying transport and status failures with
    /// exponential backoff starting at the configured retry delay.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ReaderError> {
        let parsed = validate_url(url)?;
        tracing::info!(url, "starting PDF download");

        let mut delay = self.retry_delay;
        let mut attempt = 1;
        loop {
            match self.attempt(&parsed).await {
                Ok(bytes) => {
                    tracing::info!(url, bytes = bytes.len(), "downloaded PDF");
                    return Ok(bytes);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    tracing::warn!(url, attempt, error = %e, "download attempt failed");
                    tracing::info!(wait_secs = delay.as_secs_f64(), "waiting before retry {}", attempt + 1);
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(url, attempts = attempt, error = %e, "failed to download PDF");
                    return Err(e);
                }
            }
        }
    }

    /// Extract page text from downloaded bytes on the blocking pool.
    pub async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, ReaderError> {
        if bytes.is_empty() {
            tracing::error!("no PDF content provided for text extraction");
            return Err(ReaderError::EmptyBody);
        }
        let backend = Arc::clone(&self.backend);
        let pages = tokio::task::spawn_blocking(move || backend.extract_pages(&bytes)).await??;
        tracing::info!(pages = pages.len(), "starting text extraction");
        let text = join_pages(&pages)?;
        tracing::info!(chars = text.chars().count(), "extracted text from PDF");
        Ok(text)
    }
}

impl PaperFetch for PaperReader {
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = FetchOutcome> + Send + 'a>> {
        Box::pin(async move {
            let bytes = match self.download(url).await {
                Ok(bytes) => bytes,
                Err(_) => return FetchOutcome::failed(url, "Failed to download PDF"),
            };
            match self.extract_text(bytes).await {
                Ok(text) => FetchOutcome::succeeded(url, text),
                Err(e) => {
                    tracing::error!(url, error = %e, "failed to extract text");
                    FetchOutcome::failed(url, "Failed to extract text from PDF")
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPages(Vec<String>);

    impl DocumentBackend for FixedPages {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, BackendError> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl DocumentBackend for Broken {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, BackendError> {
            Err(BackendError::OpenError("not a PDF".into()))
        }
    }

    fn reader(backend: impl DocumentBackend + 'static) -> PaperReader {
        let config = Config {
            retry_delay: Duration::from_millis(10),
            pdf_timeout: Duration::from_secs(2),
            ..Config::default()
        };
        PaperReader::new(&config, Arc::new(backend))
    }

    fn response(content_type: Option<&str>) -> reqwest::Response {
        let mut builder = http::Response::builder().status(200);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        reqwest::Response::from(builder.body("%PDF").unwrap())
    }

    // ── validate_url ───────────────────────────────────────────────────

    #[test]
    fn accepts_pdf_url() {
        assert!(validate_url("https://arxiv.org/pdf/2403.01234.pdf").is_ok());
    }

    #[test]
    fn accepts_url_without_pdf_suffix() {
        assert!(validate_url("https://example.org/paper").is_ok());
    }

    #[test]
    fn rejects_missing_scheme_or_host() {
        assert!(validate_url("arxiv.org/pdf/1.pdf").is_err());
        assert!(validate_url("file:///tmp/paper.pdf").is_err());
        assert!(validate_url("not a url").is_err());
    }

    // ── check_content_type ─────────────────────────────────────────────

    #[test]
    fn content_type_pdf_with_params() {
        assert!(check_content_type(&response(Some("Application/PDF; charset=binary"))).is_ok());
    }

    #[test]
    fn content_type_html_rejected() {
        let err = check_content_type(&response(Some("text/html"))).unwrap_err();
        assert!(matches!(err, ReaderError::ContentType(ct) if ct == "text/html"));
        assert!(check_content_type(&response(None)).is_err());
    }

    #[test]
    fn content_errors_are_not_retried() {
        assert!(!ReaderError::ContentType("text/html".into()).is_retryable());
        assert!(!ReaderError::EmptyBody.is_retryable());
        assert!(ReaderError::Status(503).is_retryable());
    }

    // ── join_pages ─────────────────────────────────────────────────────

    #[test]
    fn joins_non_empty_pages_with_blank_line() {
        let pages = vec![" Page one\n".to_string(), "   ".to_string(), "Page three".to_string()];
        assert_eq!(join_pages(&pages).unwrap(), "Page one\n\n\nPage three");
    }

    #[test]
    fn no_pages_and_no_text_are_errors() {
        assert!(matches!(join_pages(&[]), Err(ReaderError::NoPages)));
        assert!(matches!(
            join_pages(&["".to_string(), "\n".to_string()]),
            Err(ReaderError::NoText)
        ));
    }

    // ── PaperReader ────────────────────────────────────────────────────

    #[tokio::test]
    async fn extract_text_uses_backend() {
        let reader = reader(FixedPages(vec!["Abstract".into(), "Body [1]".into()]));
        let text = reader.extract_text(b"%PDF".to_vec()).await.unwrap();
        assert_eq!(text, "Abstract\n\nBody [1]");
    }

    #[tokio::test]
    async fn extract_text_propagates_backend_error() {
        let reader = reader(Broken);
        let err = reader.extract_text(b"%PDF".to_vec()).await.unwrap_err();
        assert!(matches!(err, ReaderError::Backend(_)));
    }

    #[tokio::test]
    async fn extract_text_rejects_empty_bytes() {
        let reader = reader(FixedPages(vec!["x".into()]));
        assert!(matches!(reader.extract_text(Vec::new()).await, Err(ReaderError::EmptyBody)));
    }

    #[tokio::test]
    async fn invalid_url_fails_download() {
        let reader = reader(FixedPages(vec![]));
        let outcome = reader.fetch("not a url").await;
        assert!(!outcome.success);
        assert_eq!(outcome.url, "not a url");
        assert!(outcome.text.is_none());
        assert_eq!(outcome.error.as_deref(), Some("Failed to download PDF"));
    }

    #[tokio::test]
    async fn unreachable_host_fails_after_retries() {
        let reader = reader(FixedPages(vec![]));
        let err = reader.download("http://127.0.0.1:9/paper.pdf").await.unwrap_err();
        assert!(matches!(err, ReaderError::Request(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_delay_doubles_between_attempts() {
        let reader = reader(FixedPages(vec![]));
        let started = tokio::time::Instant::now();
        let _ = reader.download("http://127.0.0.1:9/paper.pdf").await;
        // three attempts: waits of 10ms then 20ms
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
