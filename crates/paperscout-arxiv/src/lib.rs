//! arXiv search over the public Atom query API.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use paperscout_core::query::DEFAULT_MAX_TERMS;
use paperscout_core::rate_limit::check_rate_limit_response;
use paperscout_core::{
    Config, MAX_QUERY_CHARS, Paper, PaperSearch, RequestError, RequestPacer, SearchOutcome,
    normalize_query,
};

pub mod feed;

pub use feed::{FeedEntry, parse_feed};

const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api/query";

/// Longest `Retry-After` honored before the single retry.
const MAX_RETRY_WAIT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ArxivError {
    #[error("arXiv request failed: {0}")]
    Request(#[from] RequestError),
    #[error("XML parse error: {0}")]
    Xml(String),
}

/// Derive the direct PDF link from an abs URL.
///
/// Only new-style identifiers (`YYMM.NNNNN`, optional `vN`) are accepted; the
/// version suffix is dropped so the link always points at the latest version.
pub fn format_pdf_url(arxiv_url: &str) -> Option<String> {
    static ABS_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"abs/([^/]+)$").unwrap());
    static NEW_ID_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(\d{4}\.\d{5})(?:v\d+)?$").unwrap());

    let Some(id) = ABS_ID_RE.captures(arxiv_url).and_then(|c| c.get(1)) else {
        tracing::warn!(url = arxiv_url, "could not extract paper ID from URL");
        return None;
    };
    let Some(bare) = NEW_ID_RE.captures(id.as_str()).and_then(|c| c.get(1)) else {
        tracing::warn!(id = id.as_str(), "invalid arXiv paper ID format");
        return None;
    };
    Some(format!("https://arxiv.org/pdf/{}.pdf", bare.as_str()))
}

/// Paced arXiv search client.
pub struct ArxivSearch {
    client: reqwest::Client,
    pacer: RequestPacer,
    base_url: String,
    max_results: usize,
    days_back: u32,
    timeout: Duration,
}

impl ArxivSearch {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            pacer: RequestPacer::new(config.rate_limit_delay),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: config.max_search_results,
            days_back: config.days_back,
            timeout: config.pdf_timeout,
        }
    }

    /// Point the client at a different query endpoint (mirrors, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn days_back(&self) -> u32 {
        self.days_back
    }

    fn query_url(&self, query: &str, max_results: usize) -> String {
        format!(
            "{}?search_query={}&start=0&max_results={}&sortBy=submittedDate&sortOrder=descending",
            self.base_url,
            urlencoding::encode(query),
            max_results
        )
    }

    async fn fetch_feed(&self, url: &str) -> Result<String, RequestError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RequestError::Other(e.to_string()))?;

        check_rate_limit_response(&resp)?;

        if !resp.status().is_success() {
            return Err(RequestError::Other(format!("HTTP {}", resp.status())));
        }

        resp.text()
            .await
            .map_err(|e| RequestError::Other(e.to_string()))
    }

    async fn try_search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>, ArxivError> {
        let query = if query.chars().count() > MAX_QUERY_CHARS {
            normalize_query(query, DEFAULT_MAX_TERMS)
        } else {
            query.to_string()
        };

        let url = self.query_url(&query, max_results);
        tracing::debug!(%url, "querying arXiv");
        let body = self
            .pacer
            .run(MAX_RETRY_WAIT, || self.fetch_feed(&url))
            .await?;

        let entries = parse_feed(&body)?;
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(self.days_back));
        Ok(select_papers(entries, cutoff, max_results))
    }
}

/// Turn feed entries into papers: drop entries published before `cutoff` or
/// without a usable PDF link, keep at most `max_results`.
pub fn select_papers(entries: Vec<FeedEntry>, cutoff: DateTime<Utc>, max_results: usize) -> Vec<Paper> {
    let mut papers = Vec::new();

    for entry in entries {
        if papers.len() >= max_results {
            break;
        }

        let published = match DateTime::parse_from_rfc3339(&entry.published) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(id = %entry.id, error = %e, "skipping entry with unparseable date");
                continue;
            }
        };
        if published < cutoff {
            continue;
        }

        let Some(pdf_url) = format_pdf_url(&entry.id) else {
            tracing::warn!(id = %entry.id, "skipping paper due to invalid PDF URL");
            continue;
        };

        papers.push(Paper {
            title: entry.title,
            authors: entry.authors,
            summary: entry.summary,
            published: published.to_rfc3339(),
            pdf_url,
            doi: entry.doi,
            arxiv_url: entry.id,
        });
    }

    papers
}

impl PaperSearch for ArxivSearch {
    fn name(&self) -> &str {
        "arXiv"
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        max_results: Option<usize>,
    ) -> Pin<Box<dyn Future<Output = SearchOutcome> + Send + 'a>> {
        Box::pin(async move {
            if query.trim().is_empty() {
                tracing::error!("empty search query");
                return SearchOutcome::found(Vec::new());
            }

            let max_results = max_results.unwrap_or(self.max_results);
            tracing::info!(query, max_results, "searching arXiv");

            match self.try_search(query, max_results).await {
                Ok(papers) => {
                    tracing::info!(count = papers.len(), "arXiv search complete");
                    SearchOutcome::found(papers)
                }
                Err(e) => {
                    tracing::error!(error = %e, "arXiv API error");
                    SearchOutcome::failed(e.to_string())
                }
            }
        })
    }
}
