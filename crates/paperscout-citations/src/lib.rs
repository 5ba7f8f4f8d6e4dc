//! Citation mention extraction.
//!
//! An ordered library of citation patterns is applied to the full text of a
//! document and to its references section. Matches are validated, turned into
//! typed [`Citation`] records and deduplicated by identity.

pub mod config;
pub mod digest;
pub mod extractor;
pub mod patterns;
pub mod section;
pub mod validate;

pub use config::{CitationConfig, CitationConfigBuilder, ClassifierMode, ListOverride};
pub use digest::{CitationDigest, NamedMention, NumberGroup};
pub use extractor::{CandidateError, CitationExtractor};
pub use patterns::{
    Candidate, CitationMatcher, CitationPattern, Enclosure, FieldMapping, PatternSpec,
    RegexMatcher, Shape, default_patterns,
};
pub use section::{ReferencesSection, find_references_section};
pub use validate::{CitationValidator, valid_author, valid_year};
// Re-export domain types from core (canonical definitions live there)
pub use paperscout_core::{Citation, CitationBody, CitationType, DedupKey, ExtractionReport, Span};

/// Extract citations from `text` with the default configuration.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    CitationExtractor::new().extract(text)
}

/// Extract citations from `text` and wrap them in an [`ExtractionReport`].
///
/// Empty input yields a failed report with the error `Empty text provided`.
pub fn process_text(text: &str) -> ExtractionReport {
    CitationExtractor::new().process_text(text)
}
