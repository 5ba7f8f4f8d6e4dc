use regex::Regex;

use crate::patterns::{CitationPattern, PatternSpec};

/// Controls how a list of patterns/values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// How a match is assigned to the numerical branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifierMode {
    /// Numerical shape, or a parenthetical rule whose match contains a digit.
    ///
    /// `(Smith, 2020)` therefore yields a numerical record with number `2020`
    /// while `Smith (2020)` yields a named one. This is the long-standing
    /// behavior of the extractor; switch to [`ClassifierMode::ShapeOnly`] to
    /// route every author-year rule to its named branch.
    #[default]
    Compat,
    /// Only rules tagged [`Shape::Numerical`](crate::Shape::Numerical).
    ShapeOnly,
}

/// Configuration for the citation extraction engine.
///
/// `None` regex fields mean "use the built-in default".
/// Use [`CitationConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct CitationConfig {
    /// Regex locating the references section; capture group 1 is the body.
    pub(crate) section_header_re: Option<Regex>,
    /// Ordered pattern library.
    pub(crate) patterns: ListOverride<CitationPattern>,
    /// Characters of context kept either side of a match (default: 50).
    pub(crate) context_width: usize,
    /// Earliest accepted publication year (default: 1800).
    pub(crate) min_year: i32,
    /// Latest accepted publication year. `None` means current UTC year + 1.
    pub(crate) max_year: Option<i32>,
    pub(crate) classifier: ClassifierMode,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            section_header_re: None,
            patterns: ListOverride::Default,
            context_width: 50,
            min_year: 1800,
            max_year: None,
            classifier: ClassifierMode::Compat,
        }
    }
}

impl CitationConfig {
    pub fn context_width(&self) -> usize {
        self.context_width
    }

    pub fn classifier(&self) -> ClassifierMode {
        self.classifier
    }

    /// Resolve the year bounds, filling in the current year when unset.
    pub fn year_bounds(&self) -> (i32, i32) {
        use chrono::Datelike;
        let max = self
            .max_year
            .unwrap_or_else(|| chrono::Utc::now().year() + 1);
        (self.min_year, max)
    }
}

/// Builder for [`CitationConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with `regex::Error` if any pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct CitationConfigBuilder {
    section_header_re: Option<String>,
    patterns: ListOverride<PatternSpec>,
    context_width: Option<usize>,
    min_year: Option<i32>,
    max_year: Option<i32>,
    classifier: Option<ClassifierMode>,
}

impl CitationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section_header_regex(mut self, pattern: &str) -> Self {
        self.section_header_re = Some(pattern.to_string());
        self
    }

    // ── Pattern library ──

    pub fn set_patterns(mut self, patterns: Vec<PatternSpec>) -> Self {
        self.patterns = ListOverride::Replace(patterns);
        self
    }

    pub fn add_pattern(mut self, pattern: PatternSpec) -> Self {
        match &mut self.patterns {
            ListOverride::Extend(v) | ListOverride::Replace(v) => v.push(pattern),
            ListOverride::Default => self.patterns = ListOverride::Extend(vec![pattern]),
        }
        self
    }

    // ── Scalars ──

    pub fn context_width(mut self, chars: usize) -> Self {
        self.context_width = Some(chars);
        self
    }

    pub fn min_year(mut self, year: i32) -> Self {
        self.min_year = Some(year);
        self
    }

    pub fn max_year(mut self, year: i32) -> Self {
        self.max_year = Some(year);
        self
    }

    pub fn classifier(mut self, mode: ClassifierMode) -> Self {
        self.classifier = Some(mode);
        self
    }

    /// Compile all string patterns into regexes and produce a [`CitationConfig`].
    pub fn build(self) -> Result<CitationConfig, regex::Error> {
        let section_header_re = self
            .section_header_re
            .map(|p| Regex::new(&p))
            .transpose()?;

        let compile_all = |specs: Vec<PatternSpec>| -> Result<Vec<CitationPattern>, regex::Error> {
            specs.into_iter().map(PatternSpec::compile).collect()
        };

        let patterns = match self.patterns {
            ListOverride::Default => ListOverride::Default,
            ListOverride::Replace(specs) => ListOverride::Replace(compile_all(specs)?),
            ListOverride::Extend(specs) => ListOverride::Extend(compile_all(specs)?),
        };

        Ok(CitationConfig {
            section_header_re,
            patterns,
            context_width: self.context_width.unwrap_or(50),
            min_year: self.min_year.unwrap_or(1800),
            max_year: self.max_year,
            classifier: self.classifier.unwrap_or_default(),
        })
    }
}
