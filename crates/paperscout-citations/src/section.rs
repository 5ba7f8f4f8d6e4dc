//! Locating the reference list in extracted document text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::CitationConfig;

/// Body of a references section and its byte offset in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencesSection<'t> {
    pub text: &'t str,
    pub offset: usize,
}

/// Find the references section using the default heading regex.
///
/// The body runs from the line after the heading until the next blank line or
/// the end of text, so only the first paragraph of a multi-paragraph
/// bibliography is captured.
pub fn find_references_section(text: &str) -> Option<ReferencesSection<'_>> {
    find_references_section_with_config(text, &CitationConfig::default())
}

/// Config-aware version of [`find_references_section`].
///
/// A custom heading regex must put the section body in capture group 1.
pub(crate) fn find_references_section_with_config<'t>(
    text: &'t str,
    config: &CitationConfig,
) -> Option<ReferencesSection<'t>> {
    static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?is)(?:References|Bibliography|Works Cited)\s*\n+(.*?)(?:\n\n|\z)").unwrap()
    });

    let re = config.section_header_re.as_ref().unwrap_or(&SECTION_RE);
    let body = re.captures(text)?.get(1)?;
    Some(ReferencesSection {
        text: body.as_str(),
        offset: body.start(),
    })
}
