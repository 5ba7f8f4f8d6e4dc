use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use paperscout_core::{Citation, CitationType, DedupKey, ExtractionReport, Span};

use crate::config::{CitationConfig, ClassifierMode};
use crate::patterns::{Candidate, CitationPattern, Enclosure, FieldMapping, Shape, default_patterns};
use crate::section::{self, ReferencesSection};
use crate::validate::CitationValidator;

/// Failure to decompose a single candidate into citation fields.
///
/// Never escapes an extraction pass: the candidate is logged and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateError {
    #[error("pattern {pattern} has no capture group {group}")]
    MissingGroup { pattern: String, group: usize },
}

/// Which record shape a candidate is decomposed into, with its group indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Numerical,
    Author { author: usize, year: usize },
    TwoAuthors { first: usize, second: usize, year: usize },
}

/// Recognizes citation mentions in plain text.
///
/// Holds only read-only state, so one instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct CitationExtractor {
    config: CitationConfig,
    patterns: Vec<CitationPattern>,
    validator: CitationValidator,
}

impl Default for CitationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CitationExtractor {
    pub fn new() -> Self {
        Self::with_config(CitationConfig::default())
    }

    pub fn with_config(config: CitationConfig) -> Self {
        let patterns = config.patterns.resolve(default_patterns());
        let (min_year, max_year) = config.year_bounds();
        Self {
            config,
            patterns,
            validator: CitationValidator::new(min_year, max_year),
        }
    }

    pub fn config(&self) -> &CitationConfig {
        &self.config
    }

    /// The resolved pattern library, in priority order.
    pub fn patterns(&self) -> &[CitationPattern] {
        &self.patterns
    }

    /// Locate the references section using this extractor's heading regex.
    pub fn find_references_section<'t>(&self, text: &'t str) -> Option<ReferencesSection<'t>> {
        section::find_references_section_with_config(text, &self.config)
    }

    /// Extract citation mentions from `text`.
    ///
    /// The full text is scanned as the inline region, then the references
    /// section (if any) as the reference region. Output follows discovery
    /// order: region, then pattern priority, then position. Records whose
    /// dedup key was already seen are dropped.
    pub fn extract(&self, text: &str) -> Vec<Citation> {
        if text.is_empty() {
            tracing::error!("empty text provided for citation extraction");
            return Vec::new();
        }

        let mut regions = vec![(text, 0, CitationType::Inline)];
        if let Some(refs) = self.find_references_section(text) {
            tracing::debug!(offset = refs.offset, len = refs.text.len(), "found references section");
            regions.push((refs.text, refs.offset, CitationType::Reference));
        }

        let mut seen: HashSet<DedupKey> = HashSet::new();
        let mut citations = Vec::new();

        for (region, offset, citation_type) in regions {
            for pattern in &self.patterns {
                for candidate in pattern.find_candidates(region) {
                    let context = context_window(
                        region,
                        candidate.start,
                        candidate.end,
                        self.config.context_width,
                    );
                    let span = Span::new(
                        offset + candidate.token_start,
                        offset + candidate.token_end(),
                    );

                    let records = match self.decompose(pattern, &candidate, citation_type, context, span) {
                        Ok(records) => records,
                        Err(e) => {
                            tracing::warn!(
                                pattern = pattern.name(),
                                matched = candidate.matched,
                                error = %e,
                                "skipping citation candidate"
                            );
                            continue;
                        }
                    };

                    for citation in records {
                        if seen.insert(citation.dedup_key()) {
                            tracing::debug!(
                                pattern = pattern.name(),
                                citation_type = %citation.citation_type,
                                body = ?citation.body,
                                "found citation"
                            );
                            citations.push(citation);
                        }
                    }
                }
            }
        }

        tracing::info!("Found {} unique citations", citations.len());
        citations
    }

    /// Run [`extract`](Self::extract) and wrap the result in an [`ExtractionReport`].
    pub fn process_text(&self, text: &str) -> ExtractionReport {
        if text.is_empty() {
            return ExtractionReport::failed("Empty text provided");
        }
        ExtractionReport::succeeded(self.extract(text))
    }

    fn branch(&self, pattern: &CitationPattern, candidate: &Candidate<'_>) -> Branch {
        let numerical = pattern.shape() == Shape::Numerical
            || match self.config.classifier {
                ClassifierMode::Compat => {
                    pattern.enclosure() == Enclosure::Parenthetical
                        && candidate.matched.bytes().any(|b| b.is_ascii_digit())
                }
                ClassifierMode::ShapeOnly => false,
            };
        if numerical {
            return Branch::Numerical;
        }
        match pattern.fields() {
            FieldMapping::DigitRuns => Branch::Numerical,
            FieldMapping::AuthorYear { author, year } => Branch::Author { author, year },
            FieldMapping::TwoAuthorsYear { first, second, year } => {
                Branch::TwoAuthors { first, second, year }
            }
        }
    }

    fn decompose(
        &self,
        pattern: &CitationPattern,
        candidate: &Candidate<'_>,
        citation_type: CitationType,
        context: &str,
        span: Span,
    ) -> Result<Vec<Citation>, CandidateError> {
        static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

        let group = |index: usize| {
            candidate
                .group(index)
                .ok_or_else(|| CandidateError::MissingGroup {
                    pattern: pattern.name().to_string(),
                    group: index,
                })
        };

        let records = match self.branch(pattern, candidate) {
            Branch::Numerical => DIGITS_RE
                .find_iter(candidate.token)
                .map(|m| Citation::numerical(candidate.token, m.as_str(), citation_type, context, span))
                .collect(),
            Branch::Author { author, year } => {
                let (author, year) = (group(author)?, group(year)?);
                if self.validator.valid_author(author) && self.validator.valid_year(year) {
                    vec![Citation::author(author, year, citation_type, context, span)]
                } else {
                    Vec::new()
                }
            }
            Branch::TwoAuthors { first, second, year } => {
                let (first, second, year) = (group(first)?, group(second)?, group(year)?);
                if self.validator.valid_author(first)
                    && self.validator.valid_author(second)
                    && self.validator.valid_year(year)
                {
                    vec![Citation::two_authors(first, second, year, citation_type, context, span)]
                } else {
                    Vec::new()
                }
            }
        };
        Ok(records)
    }
}

/// Up to `width` characters either side of `start..end`, trimmed.
fn context_window(text: &str, start: usize, end: usize, width: usize) -> &str {
    let lo = text[..start]
        .char_indices()
        .rev()
        .take(width)
        .last()
        .map_or(start, |(i, _)| i);
    let hi = text[end..]
        .char_indices()
        .nth(width)
        .map_or(text.len(), |(i, _)| end + i);
    text[lo..hi].trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CitationConfigBuilder;
    use crate::patterns::PatternSpec;

    fn numbers(citations: &[Citation]) -> Vec<&str> {
        citations.iter().filter_map(|c| c.number()).collect()
    }

    #[test]
    fn bracketed_numbers() {
        let citations = CitationExtractor::new().extract("See [1] and [2,3] for details.");
        assert_eq!(numbers(&citations), vec!["1", "2", "3"]);
        assert!(citations.iter().all(|c| c.citation_type == CitationType::Inline));
        assert_eq!(citations[0].citation_text(), Some("[1]"));
        assert_eq!(citations[1].citation_text(), Some("[2,3]"));
        assert_eq!(citations[2].citation_text(), Some("[2,3]"));
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(CitationExtractor::new().extract("").is_empty());
    }

    #[test]
    fn process_text_empty_fails() {
        let report = CitationExtractor::new().process_text("");
        assert!(!report.success);
        assert!(report.citations.is_empty());
        assert_eq!(report.error.as_deref(), Some("Empty text provided"));
    }

    #[test]
    fn process_text_success() {
        let report = CitationExtractor::new().process_text("no citations here");
        assert!(report.success);
        assert!(report.citations.is_empty());
        assert!(report.error.is_none());
    }

    #[test]
    fn narrative_author_is_named() {
        let citations = CitationExtractor::new().extract("This was shown by Smith (2020) before.");
        let named: Vec<_> = citations.iter().filter(|c| !c.is_numerical()).collect();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].author_name(), Some("Smith"));
        assert_eq!(named[0].year(), Some("2020"));
        // `(2020)` also satisfies the parenthesized-number rule
        assert!(citations.iter().any(|c| c.citation_text() == Some("(2020)")));
    }

    #[test]
    fn parenthetical_author_year_is_numerical_in_compat_mode() {
        let citations = CitationExtractor::new().extract("prior work (Smith, 2020).");
        assert!(citations.iter().all(|c| c.is_numerical()));
        assert!(citations
            .iter()
            .any(|c| c.citation_text() == Some("(Smith, 2020)") && c.number() == Some("2020")));
    }

    #[test]
    fn parenthetical_author_year_is_named_in_shape_only_mode() {
        let config = CitationConfigBuilder::new()
            .classifier(ClassifierMode::ShapeOnly)
            .build()
            .unwrap();
        let citations = CitationExtractor::with_config(config).extract("prior work (Smith, 2020).");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].author_name(), Some("Smith"));
    }

    #[test]
    fn two_authors() {
        let citations = CitationExtractor::new().extract("Smith and Jones (2019) found");
        let pair = citations.iter().find_map(|c| c.authors()).unwrap();
        assert_eq!(pair, &["Smith".to_string(), "Jones".to_string()]);
    }

    #[test]
    fn year_out_of_range_rejected() {
        let citations = CitationExtractor::new().extract("Smith (1700) and Jones (9999)");
        assert!(citations.iter().all(|c| c.is_numerical()));
    }

    #[test]
    fn repeated_mention_kept_once() {
        let citations = CitationExtractor::new().extract("[4] then again [4] and [4].");
        assert_eq!(numbers(&citations), vec!["4"]);
        assert_eq!(citations[0].span.start, 0);
    }

    #[test]
    fn span_covers_citation_token_only() {
        let text = "See [1] and [2,3] for details.";
        let citations = CitationExtractor::new().extract(text);
        for c in &citations {
            assert_eq!(&text[c.span.start..c.span.end], c.citation_text().unwrap());
        }
        assert_eq!(citations[0].span, Span::new(4, 7));
        // The context window still reaches past the token
        assert!(citations[0].context.contains("[1] and [2,3]"));
    }

    #[test]
    fn reference_region_is_offset() {
        let text = "Body [1].\n\nReferences\n[1] Doe, J. Title.";
        let citations = CitationExtractor::new().extract(text);
        let reference = citations
            .iter()
            .find(|c| c.citation_type == CitationType::Reference)
            .unwrap();
        let Span { start, end } = reference.span;
        assert_eq!(&text[start..start + 3], "[1]");
        assert!(end <= text.len());
    }

    #[test]
    fn context_window_is_clipped_and_trimmed() {
        let text = "  [1]  ";
        assert_eq!(context_window(text, 2, 5, 50), "[1]");
        let text = "abcdefghij[1]klmnopqrst";
        assert_eq!(context_window(text, 10, 13, 3), "hij[1]klm");
    }

    #[test]
    fn context_window_respects_char_boundaries() {
        let text = "ééééé[1]ééééé";
        let start = text.find('[').unwrap();
        let end = start + 3;
        assert_eq!(context_window(text, start, end, 2), "éé[1]éé");
    }

    #[test]
    fn missing_group_skips_candidate() {
        let config = CitationConfigBuilder::new()
            .set_patterns(vec![
                PatternSpec::new(r"<([A-Z][a-z]+)>", Shape::TwoAuthor),
                PatternSpec::new(r"\[(\d+)\]", Shape::Numerical),
            ])
            .build()
            .unwrap();
        let citations = CitationExtractor::with_config(config).extract("<Smith> and [3]");
        assert_eq!(numbers(&citations), vec!["3"]);
    }

    #[test]
    fn context_width_is_configurable() {
        let config = CitationConfigBuilder::new().context_width(0).build().unwrap();
        let citations = CitationExtractor::with_config(config).extract("see [7] here");
        assert_eq!(citations[0].context, "[7]");
    }
}
