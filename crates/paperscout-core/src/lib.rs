use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod query;
pub mod rate_limit;
pub mod source;

// Re-export for convenience
pub use backend::{BackendError, DocumentBackend};
pub use query::{MAX_QUERY_CHARS, normalize_query};
pub use rate_limit::{RequestError, RequestPacer};
pub use source::{PaperFetch, PaperSearch};

/// Where in a document a citation mention was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationType {
    /// Found while scanning the full document body.
    Inline,
    /// Found inside the isolated References/Bibliography section.
    Reference,
}

impl CitationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationType::Inline => "inline",
            CitationType::Reference => "reference",
        }
    }
}

impl std::fmt::Display for CitationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte offsets of a match in the original input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// True if this span lies entirely within `outer`.
    pub fn within(&self, outer: &Span) -> bool {
        self.start >= outer.start && self.end <= outer.end
    }
}

/// Marker serialized as `"type": "numerical"` on numerical citations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericalTag {
    #[default]
    Numerical,
}

/// The identity-bearing part of a citation mention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CitationBody {
    /// `[7]`, `[1,2,3]`, `(4)`, `[Smi20]`: one record per digit run.
    Numerical {
        citation_text: String,
        number: String,
        #[serde(rename = "type")]
        tag: NumericalTag,
    },
    /// `Smith and Jones (2020)`.
    TwoAuthors { authors: [String; 2], year: String },
    /// `Smith (2020)`, `(Smith et al., 2020a)`.
    Author { author: String, year: String },
}

/// A recognized citation mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(flatten)]
    pub body: CitationBody,
    pub citation_type: CitationType,
    /// Up to 50 characters either side of the match, trimmed. For human review only.
    pub context: String,
    pub span: Span,
}

/// Identity used to suppress repeated citation records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Numerical {
        citation_type: CitationType,
        citation_text: String,
        number: String,
    },
    TwoAuthors {
        citation_type: CitationType,
        authors: [String; 2],
        year: String,
    },
    Author {
        citation_type: CitationType,
        author: String,
        year: String,
    },
}

impl Citation {
    pub fn numerical(
        citation_text: impl Into<String>,
        number: impl Into<String>,
        citation_type: CitationType,
        context: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            body: CitationBody::Numerical {
                citation_text: citation_text.into(),
                number: number.into(),
                tag: NumericalTag::Numerical,
            },
            citation_type,
            context: context.into(),
            span,
        }
    }

    pub fn author(
        author: impl Into<String>,
        year: impl Into<String>,
        citation_type: CitationType,
        context: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            body: CitationBody::Author {
                author: author.into(),
                year: year.into(),
            },
            citation_type,
            context: context.into(),
            span,
        }
    }

    pub fn two_authors(
        first: impl Into<String>,
        second: impl Into<String>,
        year: impl Into<String>,
        citation_type: CitationType,
        context: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            body: CitationBody::TwoAuthors {
                authors: [first.into(), second.into()],
                year: year.into(),
            },
            citation_type,
            context: context.into(),
            span,
        }
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self.body, CitationBody::Numerical { .. })
    }

    pub fn number(&self) -> Option<&str> {
        match &self.body {
            CitationBody::Numerical { number, .. } => Some(number),
            _ => None,
        }
    }

    pub fn citation_text(&self) -> Option<&str> {
        match &self.body {
            CitationBody::Numerical { citation_text, .. } => Some(citation_text),
            _ => None,
        }
    }

    pub fn author_name(&self) -> Option<&str> {
        match &self.body {
            CitationBody::Author { author, .. } => Some(author),
            _ => None,
        }
    }

    pub fn authors(&self) -> Option<&[String; 2]> {
        match &self.body {
            CitationBody::TwoAuthors { authors, .. } => Some(authors),
            _ => None,
        }
    }

    pub fn year(&self) -> Option<&str> {
        match &self.body {
            CitationBody::Numerical { .. } => None,
            CitationBody::TwoAuthors { year, .. } | CitationBody::Author { year, .. } => Some(year),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        let citation_type = self.citation_type;
        match &self.body {
            CitationBody::Numerical {
                citation_text,
                number,
                ..
            } => DedupKey::Numerical {
                citation_type,
                citation_text: citation_text.clone(),
                number: number.clone(),
            },
            CitationBody::TwoAuthors { authors, year } => DedupKey::TwoAuthors {
                citation_type,
                authors: authors.clone(),
                year: year.clone(),
            },
            CitationBody::Author { author, year } => DedupKey::Author {
                citation_type,
                author: author.clone(),
                year: year.clone(),
            },
        }
    }
}

/// Result of a citation extraction request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub success: bool,
    pub citations: Vec<Citation>,
    pub error: Option<String>,
}

impl ExtractionReport {
    pub fn succeeded(citations: Vec<Citation>) -> Self {
        Self {
            success: true,
            citations,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            citations: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// One search hit from the paper repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    /// RFC 3339 timestamp in UTC.
    pub published: String,
    pub pdf_url: String,
    pub doi: Option<String>,
    pub arxiv_url: String,
}

/// Result of a paper search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub results: Vec<Paper>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn found(results: Vec<Paper>) -> Self {
        Self {
            results,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Result of downloading a document and extracting its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub success: bool,
    pub url: String,
    /// Page texts joined by a blank line. `None` on failure.
    pub text: Option<String>,
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn succeeded(url: impl Into<String>, text: String) -> Self {
        Self {
            success: true,
            url: url.into(),
            text: Some(text),
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.into(),
            text: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Runtime configuration shared by the search, reader and agent crates.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default number of search results when a task gives no hint.
    pub max_search_results: usize,
    /// Fixed delay enforced between consecutive search requests.
    pub rate_limit_delay: Duration,
    /// Only papers published within this many days are returned.
    pub days_back: u32,
    /// Per-request timeout for document downloads.
    pub pdf_timeout: Duration,
    pub max_download_retries: u32,
    /// Delay before the first download retry; doubled on each further retry.
    pub retry_delay: Duration,
    /// Directory for rotated log files. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_search_results: 5,
            rate_limit_delay: Duration::from_secs(3),
            days_back: 1095,
            pdf_timeout: Duration::from_secs(30),
            max_download_retries: 3,
            retry_delay: Duration::from_secs(1),
            log_dir: None,
        }
    }
}

impl Config {
    /// Overlay values present in a loaded config file onto this config.
    pub fn apply_file(mut self, file: &config_file::ConfigFile) -> Result<Self, CoreError> {
        if let Some(search) = &file.search {
            if let Some(n) = search.max_results {
                if n == 0 {
                    return Err(CoreError::Config("search.max_results must be > 0".into()));
                }
                self.max_search_results = n;
            }
            if let Some(secs) = search.rate_limit_delay_secs {
                self.rate_limit_delay = seconds(secs, "search.rate_limit_delay_secs")?;
            }
            if let Some(days) = search.days_back {
                self.days_back = days;
            }
        }
        if let Some(download) = &file.download {
            if let Some(secs) = download.timeout_secs {
                self.pdf_timeout = Duration::from_secs(secs);
            }
            if let Some(n) = download.max_retries {
                self.max_download_retries = n;
            }
            if let Some(secs) = download.retry_delay_secs {
                self.retry_delay = seconds(secs, "download.retry_delay_secs")?;
            }
        }
        if let Some(dir) = file.logging.as_ref().and_then(|l| l.log_dir.as_ref()) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        Ok(self)
    }
}

fn seconds(value: f64, field: &str) -> Result<Duration, CoreError> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| CoreError::Config(format!("{field} must be a non-negative number")))
}
