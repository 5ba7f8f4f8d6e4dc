//! Grouping of inline citations for display.

use std::collections::BTreeSet;
use std::fmt;

use paperscout_core::{Citation, CitationBody, CitationType};

/// All inline mentions of one citation number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberGroup {
    pub number: String,
    /// Distinct citation texts carrying this number, e.g. `[2]` and `[2,3]`.
    pub texts: BTreeSet<String>,
}

impl NumberGroup {
    pub fn occurrences(&self) -> usize {
        self.texts.len()
    }
}

/// A named inline citation, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedMention {
    Author { author: String, year: String },
    TwoAuthors { first: String, second: String, year: String },
}

impl fmt::Display for NamedMention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedMention::Author { author, year } => write!(f, "{author} ({year})"),
            NamedMention::TwoAuthors { first, second, year } => {
                write!(f, "{first} and {second} ({year})")
            }
        }
    }
}

/// Inline citations grouped for a human reader.
///
/// Reference-list records are ignored. Numerical groups are ordered by
/// numeric value; named mentions keep discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationDigest {
    pub numbers: Vec<NumberGroup>,
    pub named: Vec<NamedMention>,
}

impl CitationDigest {
    pub fn from_citations(citations: &[Citation]) -> Self {
        let mut digest = Self::default();

        for citation in citations.iter().filter(|c| c.citation_type == CitationType::Inline) {
            match &citation.body {
                CitationBody::Numerical {
                    citation_text,
                    number,
                    ..
                } => {
                    let group = match digest.numbers.iter_mut().position(|g| &g.number == number) {
                        Some(i) => &mut digest.numbers[i],
                        None => {
                            digest.numbers.push(NumberGroup {
                                number: number.clone(),
                                texts: BTreeSet::new(),
                            });
                            let last = digest.numbers.len() - 1;
                            &mut digest.numbers[last]
                        }
                    };
                    group.texts.insert(citation_text.clone());
                }
                CitationBody::Author { author, year } => digest.named.push(NamedMention::Author {
                    author: author.clone(),
                    year: year.clone(),
                }),
                CitationBody::TwoAuthors { authors, year } => {
                    let [first, second] = authors.clone();
                    digest.named.push(NamedMention::TwoAuthors {
                        first,
                        second,
                        year: year.clone(),
                    })
                }
            }
        }

        digest
            .numbers
            .sort_by(|a, b| numeric_key(&a.number).cmp(&numeric_key(&b.number)));
        digest
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty() && self.named.is_empty()
    }
}

/// Digit strings compare by value: drop leading zeros, then shorter is smaller.
fn numeric_key(number: &str) -> (usize, &str) {
    let trimmed = number.trim_start_matches('0');
    (trimmed.len(), trimmed)
}
