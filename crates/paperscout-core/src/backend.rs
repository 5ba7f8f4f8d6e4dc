use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open document: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for document text extraction backends.
///
/// Implementors turn the raw bytes of a downloaded document into per-page
/// plain text; joining pages and deciding what counts as a failure lives in
/// the reader crate.
pub trait DocumentBackend: Send + Sync {
    /// Extract the text of every page, in page order.
    ///
    /// A page whose text could not be recovered is returned as an empty
    /// string so that page numbering stays aligned.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, BackendError>;
}
