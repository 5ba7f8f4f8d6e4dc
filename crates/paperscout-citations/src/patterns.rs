//! The ordered citation pattern library.
//!
//! Each rule pairs a matcher with a shape tag, an enclosure and a field
//! mapping. Rule order is priority order: numerical rules come first since
//! they are the least ambiguous, author-year rules after them. The same text
//! may be matched by several rules; only the dedup key keeps records apart.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

/// Structural family of a citation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// `[7]`, `[1,2,3]`, `[1-3]`, `(4)`, `[Smi20a]`.
    Numerical,
    /// `Smith (2020)`, `(Smith, 2020)`.
    SingleAuthor,
    /// `Smith et al. (2020)`, `(Smith, Lee et al., 2020a)`; collapses to the first author.
    EtAl,
    /// `Smith and Jones (2020)`.
    TwoAuthor,
    /// Author-year with a trailing `p. N`.
    Paginated,
    /// Author-year with a trailing `vol. N`.
    Volumed,
}

impl Shape {
    /// The field mapping a rule of this shape uses unless told otherwise.
    pub fn default_fields(&self) -> FieldMapping {
        match self {
            Shape::Numerical => FieldMapping::DigitRuns,
            Shape::TwoAuthor => FieldMapping::TwoAuthorsYear {
                first: 1,
                second: 2,
                year: 3,
            },
            Shape::SingleAuthor | Shape::EtAl | Shape::Paginated | Shape::Volumed => {
                FieldMapping::AuthorYear { author: 1, year: 2 }
            }
        }
    }
}

/// What delimits the citation in running text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Enclosure {
    /// Opens with `[`.
    Bracketed,
    /// Opens with `(`: the whole citation sits inside parentheses.
    Parenthetical,
    /// Author name in running text, year in parentheses after it.
    Narrative,
}

impl Enclosure {
    /// Infer the enclosure from the leading token of a regex source.
    pub fn infer(source: &str) -> Self {
        if source.starts_with(r"\[") || source.starts_with(r"(?P<cite>\[") {
            Enclosure::Bracketed
        } else if source.starts_with(r"\(") || source.starts_with(r"(?P<cite>\(") {
            Enclosure::Parenthetical
        } else {
            Enclosure::Narrative
        }
    }
}

/// How capture groups map onto citation fields.
///
/// Group indices are regex capture group numbers (group 0 is the full match).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldMapping {
    /// Every run of digits in the citation token becomes one record.
    DigitRuns,
    AuthorYear { author: usize, year: usize },
    TwoAuthorsYear { first: usize, second: usize, year: usize },
}

/// One match produced by a [`CitationMatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'t> {
    /// Full matched text.
    pub matched: &'t str,
    /// Byte offsets of the full match within the scanned text.
    pub start: usize,
    pub end: usize,
    /// The citation token itself (named group `cite`, or the full match).
    pub token: &'t str,
    /// Byte offset of `token` within the scanned text.
    pub token_start: usize,
    /// Capture groups 1..n; `None` for groups that did not participate.
    groups: Vec<Option<&'t str>>,
}

impl<'t> Candidate<'t> {
    pub fn new(
        matched: &'t str,
        start: usize,
        end: usize,
        token: &'t str,
        token_start: usize,
        groups: Vec<Option<&'t str>>,
    ) -> Self {
        Self {
            matched,
            start,
            end,
            token,
            token_start,
            groups,
        }
    }

    /// Byte offset just past `token`.
    pub fn token_end(&self) -> usize {
        self.token_start + self.token.len()
    }

    /// Capture group `index` (1-based), if it exists and participated.
    pub fn group(&self, index: usize) -> Option<&'t str> {
        if index == 0 {
            return Some(self.matched);
        }
        self.groups.get(index - 1).copied().flatten()
    }
}

/// Finds candidate citation spans in text.
///
/// Decouples the engine (validation, dedup, context windows) from the
/// matching technology. Matches must be non-overlapping and left to right.
pub trait CitationMatcher: Send + Sync {
    fn find_candidates<'t>(&self, text: &'t str) -> Vec<Candidate<'t>>;

    /// Human-readable source of the matcher, used in logs.
    fn source(&self) -> &str;
}

/// [`CitationMatcher`] backed by a compiled regex.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl CitationMatcher for RegexMatcher {
    fn find_candidates<'t>(&self, text: &'t str) -> Vec<Candidate<'t>> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let full = caps.get(0)?;
                let token = caps.name("cite").unwrap_or(full);
                let groups = (1..caps.len())
                    .map(|i| caps.get(i).map(|m| m.as_str()))
                    .collect();
                Some(Candidate::new(
                    full.as_str(),
                    full.start(),
                    full.end(),
                    token.as_str(),
                    token.start(),
                    groups,
                ))
            })
            .collect()
    }

    fn source(&self) -> &str {
        self.regex.as_str()
    }
}

/// An immutable rule of the pattern library.
#[derive(Clone)]
pub struct CitationPattern {
    name: String,
    matcher: Arc<dyn CitationMatcher>,
    shape: Shape,
    enclosure: Enclosure,
    fields: FieldMapping,
}

impl fmt::Debug for CitationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CitationPattern")
            .field("name", &self.name)
            .field("source", &self.matcher.source())
            .field("shape", &self.shape)
            .field("enclosure", &self.enclosure)
            .field("fields", &self.fields)
            .finish()
    }
}

impl CitationPattern {
    pub fn new(
        name: impl Into<String>,
        matcher: Arc<dyn CitationMatcher>,
        shape: Shape,
        enclosure: Enclosure,
        fields: FieldMapping,
    ) -> Self {
        Self {
            name: name.into(),
            matcher,
            shape,
            enclosure,
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        self.matcher.source()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn enclosure(&self) -> Enclosure {
        self.enclosure
    }

    pub fn fields(&self) -> FieldMapping {
        self.fields
    }

    pub fn find_candidates<'t>(&self, text: &'t str) -> Vec<Candidate<'t>> {
        self.matcher.find_candidates(text)
    }
}

/// Uncompiled description of a regex rule, as accepted by the config builder.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub name: Option<String>,
    pub regex: String,
    pub shape: Shape,
    pub enclosure: Option<Enclosure>,
    pub fields: Option<FieldMapping>,
}

impl PatternSpec {
    /// A rule with enclosure inferred from the regex and the shape's default fields.
    pub fn new(regex: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: None,
            regex: regex.into(),
            shape,
            enclosure: None,
            fields: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn enclosure(mut self, enclosure: Enclosure) -> Self {
        self.enclosure = Some(enclosure);
        self
    }

    pub fn fields(mut self, fields: FieldMapping) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn compile(self) -> Result<CitationPattern, regex::Error> {
        let matcher = RegexMatcher::new(&self.regex)?;
        let enclosure = self
            .enclosure
            .unwrap_or_else(|| Enclosure::infer(&self.regex));
        let fields = self.fields.unwrap_or_else(|| self.shape.default_fields());
        let name = self.name.unwrap_or_else(|| self.regex.clone());
        Ok(CitationPattern::new(
            name,
            Arc::new(matcher),
            self.shape,
            enclosure,
            fields,
        ))
    }
}

/// Capitalized name, one or more words: `Smith`, `Van Dyke`.
const NAME: &str = r"[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*";

fn rule(name: &str, regex: String, shape: Shape, enclosure: Enclosure) -> PatternSpec {
    PatternSpec::new(regex, shape)
        .named(name)
        .enclosure(enclosure)
}

fn default_specs() -> Vec<PatternSpec> {
    use Enclosure::{Bracketed, Narrative, Parenthetical};
    use Shape::*;

    vec![
        // ── Numerical ──
        rule(
            "bracket-number-annotated",
            r"(?P<cite>\[\d+\])(?:\s*[A-Za-z\s\-\.']+)?".into(),
            Numerical,
            Bracketed,
        ),
        rule(
            "bracket-number-list",
            r"\[(\d+(?:,\s*\d+)*)\]".into(),
            Numerical,
            Bracketed,
        ),
        rule(
            "bracket-number-range",
            r"\[(?:\d+)(?:-\d+)*\]".into(),
            Numerical,
            Bracketed,
        ),
        rule("paren-number", r"\((\d+)\)".into(), Numerical, Parenthetical),
        rule(
            "paren-number-list",
            r"\((\d+(?:,\s*\d+)*)\)".into(),
            Numerical,
            Parenthetical,
        ),
        rule(
            "bracket-alphanumeric",
            r"\[([A-Za-z]+\d{2}(?:[a-z])?)\]".into(),
            Numerical,
            Bracketed,
        ),
        // ── et al. ──
        rule(
            "et-al-narrative",
            format!(r"({NAME})\s+et\s+al\.\s*\((\d{{4}})\)"),
            EtAl,
            Narrative,
        ),
        rule(
            "et-al-parenthetical",
            format!(r"\(({NAME})\s+et\s+al\.\s*,\s*(\d{{4}})\)"),
            EtAl,
            Parenthetical,
        ),
        // ── Single author ──
        rule(
            "author-narrative",
            format!(r"({NAME})\s*\((\d{{4}})\)"),
            SingleAuthor,
            Narrative,
        ),
        rule(
            "author-parenthetical",
            format!(r"\(({NAME})\s*,\s*(\d{{4}})\)"),
            SingleAuthor,
            Parenthetical,
        ),
        // ── Two authors ──
        rule(
            "two-authors-narrative",
            format!(r"({NAME})\s+and\s+({NAME})\s*\((\d{{4}})\)"),
            TwoAuthor,
            Narrative,
        ),
        rule(
            "two-authors-parenthetical",
            format!(r"\(({NAME})\s+and\s+({NAME}),\s*(\d{{4}})\)"),
            TwoAuthor,
            Parenthetical,
        ),
        // ── et al. with disambiguated years (2020a) ──
        rule(
            "et-al-narrative-suffixed",
            format!(r"({NAME})\s+et\s+al\.\s*\((\d{{4}}(?:[a-z])?)\)"),
            EtAl,
            Narrative,
        ),
        rule(
            "et-al-parenthetical-suffixed",
            format!(r"\(({NAME})\s+et\s+al\.\s*,\s*(\d{{4}}(?:[a-z])?)\)"),
            EtAl,
            Parenthetical,
        ),
        // ── Comma-separated author lists ending in et al. ──
        rule(
            "author-list-et-al-narrative",
            format!(r"({NAME})(?:\s*,\s*{NAME})*\s+et\s+al\.\s*\((\d{{4}})\)"),
            EtAl,
            Narrative,
        ),
        rule(
            "author-list-et-al-parenthetical",
            format!(r"\(({NAME})(?:\s*,\s*{NAME})*\s+et\s+al\.\s*,\s*(\d{{4}})\)"),
            EtAl,
            Parenthetical,
        ),
        // ── Page annotations ──
        rule(
            "paginated-narrative",
            format!(r"({NAME})\s*\((\d{{4}}),\s*p\.\s*\d+\)"),
            Paginated,
            Narrative,
        ),
        rule(
            "paginated-parenthetical",
            format!(r"\(({NAME})\s*,\s*(\d{{4}}),\s*p\.\s*\d+\)"),
            Paginated,
            Parenthetical,
        ),
        // ── Volume annotations ──
        rule(
            "volumed-narrative",
            format!(r"({NAME})\s*\((\d{{4}}),\s*vol\.\s*\d+\)"),
            Volumed,
            Narrative,
        ),
        rule(
            "volumed-parenthetical",
            format!(r"\(({NAME})\s*,\s*(\d{{4}}),\s*vol\.\s*\d+\)"),
            Volumed,
            Parenthetical,
        ),
    ]
}

/// The built-in pattern library, in priority order.
pub fn default_patterns() -> &'static [CitationPattern] {
    static PATTERNS: Lazy<Vec<CitationPattern>> = Lazy::new(|| {
        default_specs()
            .into_iter()
            .map(|spec| spec.compile().unwrap())
            .collect()
    });
    &PATTERNS
}
