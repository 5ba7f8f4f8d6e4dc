//! Acceptance filters for author names and years captured by the pattern library.
//!
//! A candidate failing either check is treated as a non-match, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

static AUTHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z\s\-\.']+$").unwrap());

/// Stateless validator bound to a year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitationValidator {
    min_year: i32,
    max_year: i32,
}

impl CitationValidator {
    pub fn new(min_year: i32, max_year: i32) -> Self {
        Self { min_year, max_year }
    }

    /// Accept `2020` or `2020a` when the numeric part is within the window.
    pub fn valid_year(&self, year: &str) -> bool {
        let digits = strip_disambiguator(year);
        match digits.parse::<i32>() {
            Ok(y) => (self.min_year..=self.max_year).contains(&y),
            Err(_) => false,
        }
    }

    pub fn valid_author(&self, author: &str) -> bool {
        valid_author(author)
    }
}

impl Default for CitationValidator {
    /// 1800 through next year.
    fn default() -> Self {
        use chrono::Datelike;
        Self::new(1800, chrono::Utc::now().year() + 1)
    }
}

/// Letters, whitespace, hyphen, period and apostrophe only; at least one
/// word and at least two characters.
pub fn valid_author(author: &str) -> bool {
    author.chars().count() >= 2
        && author.split_whitespace().next().is_some()
        && AUTHOR_RE.is_match(author)
}

/// [`CitationValidator::valid_year`] with the default window.
pub fn valid_year(year: &str) -> bool {
    CitationValidator::default().valid_year(year)
}

fn strip_disambiguator(year: &str) -> &str {
    match year.chars().last() {
        Some(c) if c.is_ascii_lowercase() => &year[..year.len() - 1],
        _ => year,
    }
}
