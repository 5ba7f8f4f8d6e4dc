//! Collaborator traits for the network-facing parts of the pipeline.

use std::future::Future;
use std::pin::Pin;

use crate::{FetchOutcome, SearchOutcome};

/// A paper repository that can be searched by topic.
pub trait PaperSearch: Send + Sync {
    /// The canonical name of this repository (e.g., "arXiv").
    fn name(&self) -> &str;

    /// Search for papers matching `query`.
    ///
    /// `max_results` overrides the implementation's default result count.
    /// Failures are reported through [`SearchOutcome::error`], never as a panic.
    fn search<'a>(
        &'a self,
        query: &'a str,
        max_results: Option<usize>,
    ) -> Pin<Box<dyn Future<Output = SearchOutcome> + Send + 'a>>;
}

/// Downloads a document and returns its plain text.
pub trait PaperFetch: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str)
    -> Pin<Box<dyn Future<Output = FetchOutcome> + Send + 'a>>;
}
