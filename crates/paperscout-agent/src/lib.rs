//! The research agent: routes an instruction to search, read or citation extraction.

use std::sync::Arc;

use serde::Serialize;

use paperscout_arxiv::ArxivSearch;
use paperscout_citations::CitationExtractor;
use paperscout_core::{
    Config, DocumentBackend, ExtractionReport, FetchOutcome, PaperFetch, PaperSearch,
    SearchOutcome,
};
use paperscout_reader::PaperReader;

pub mod dispatch;

pub use dispatch::{Task, TaskError, parse_task};

/// `{ success: false, error }` for instructions that could not be routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub success: bool,
    pub error: String,
}

impl From<TaskError> for TaskFailure {
    fn from(err: TaskError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
        }
    }
}

/// Result of [`ResearchAgent::run`], serialized as the underlying outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TaskOutcome {
    Search(SearchOutcome),
    Read(FetchOutcome),
    Citations(ExtractionReport),
    Failed(TaskFailure),
}

impl TaskOutcome {
    /// The error message carried by any outcome kind.
    pub fn error(&self) -> Option<&str> {
        match self {
            TaskOutcome::Search(o) => o.error.as_deref(),
            TaskOutcome::Read(o) => o.error.as_deref(),
            TaskOutcome::Citations(o) => o.error.as_deref(),
            TaskOutcome::Failed(f) => Some(&f.error),
        }
    }
}

pub struct ResearchAgent {
    search: Box<dyn PaperSearch>,
    fetch: Box<dyn PaperFetch>,
    extractor: CitationExtractor,
}

impl ResearchAgent {
    pub fn new(
        search: Box<dyn PaperSearch>,
        fetch: Box<dyn PaperFetch>,
        extractor: CitationExtractor,
    ) -> Self {
        Self {
            search,
            fetch,
            extractor,
        }
    }

    /// An agent over arXiv and the HTTP reader, reading documents with `backend`.
    pub fn from_config(config: &Config, backend: Arc<dyn DocumentBackend>) -> Self {
        Self::new(
            Box::new(ArxivSearch::new(config)),
            Box::new(PaperReader::new(config, backend)),
            CitationExtractor::new(),
        )
    }

    pub async fn search_papers(&self, query: &str, max_results: Option<usize>) -> SearchOutcome {
        self.search.search(query, max_results).await
    }

    pub async fn process_paper(&self, url: &str) -> FetchOutcome {
        self.fetch.fetch(url).await
    }

    pub fn extract_citations(&self, text: &str) -> ExtractionReport {
        self.extractor.process_text(text)
    }

    /// Route `task` and run the selected operation.
    ///
    /// Never fails: routing errors come back as [`TaskOutcome::Failed`].
    pub async fn run(&self, task: &str, max_results: Option<usize>) -> TaskOutcome {
        let task = match parse_task(task) {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(error = %e, "invalid task format");
                return TaskOutcome::Failed(e.into());
            }
        };

        match task {
            Task::Search { topic } => {
                tracing::info!(query = %topic, "executing search task");
                TaskOutcome::Search(self.search_papers(&topic, max_results).await)
            }
            Task::Read { url } => {
                tracing::info!(%url, "executing paper processing task");
                TaskOutcome::Read(self.process_paper(&url).await)
            }
            Task::ExtractCitations { text } => {
                tracing::info!(len = text.len(), "executing citation extraction task");
                TaskOutcome::Citations(self.extract_citations(&text))
            }
        }
    }
}
