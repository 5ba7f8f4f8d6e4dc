//! Group the blocks of a paper's text under its key sections.

use once_cell::sync::Lazy;
use regex::Regex;

/// A recognized section of a paper, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Abstract,
    Introduction,
    Methods,
    Results,
    Conclusion,
    /// Content preceding the first key section.
    General,
}

impl SectionKind {
    const KEYED: [SectionKind; 5] = [
        SectionKind::Abstract,
        SectionKind::Introduction,
        SectionKind::Methods,
        SectionKind::Results,
        SectionKind::Conclusion,
    ];

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            SectionKind::Abstract => &["abstract", "summary"],
            SectionKind::Introduction => &["introduction", "background"],
            SectionKind::Methods => &["methods", "methodology", "approach"],
            SectionKind::Results => &["results", "findings", "analysis"],
            SectionKind::Conclusion => &["conclusion", "discussion", "implications"],
            SectionKind::General => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::Abstract => "ABSTRACT",
            SectionKind::Introduction => "INTRODUCTION",
            SectionKind::Methods => "METHODS",
            SectionKind::Results => "RESULTS",
            SectionKind::Conclusion => "CONCLUSION",
            SectionKind::General => "GENERAL CONTENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineSection {
    pub kind: SectionKind,
    /// Text blocks in document order. The heading line of the opening block is dropped.
    pub blocks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    pub fn section(&self, kind: SectionKind) -> Option<&OutlineSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}

/// Split `text` on blank lines and assign each block to a section.
///
/// A block mentioning a keyword of a kind not yet seen opens that section.
/// Each kind opens at most once; later blocks attach to the open section,
/// and blocks before the first key section become general content.
pub fn outline(text: &str) -> Outline {
    static BLANK_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

    let mut outline = Outline::default();
    let mut opened: Vec<SectionKind> = Vec::new();

    for block in BLANK_LINE_RE.split(text).map(str::trim).filter(|b| !b.is_empty()) {
        let lower = block.to_lowercase();
        let new_kind = SectionKind::KEYED.into_iter().find(|kind| {
            !opened.contains(kind) && kind.keywords().iter().any(|k| lower.contains(k))
        });

        if let Some(kind) = new_kind {
            opened.push(kind);
            let content = match block.split_once('\n') {
                Some((_, rest)) => rest.trim(),
                None => block,
            };
            outline.sections.push(OutlineSection {
                kind,
                blocks: vec![content.to_string()],
            });
            continue;
        }

        match outline.sections.last_mut() {
            Some(section) => section.blocks.push(block.to_string()),
            None => outline.sections.push(OutlineSection {
                kind: SectionKind::General,
                blocks: vec![block.to_string()],
            }),
        }
    }

    outline
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPER: &str = "\
A Study of Things
J. Doe

Abstract
We study things.

1 Introduction
Things matter.

More on why things matter.

2 Methods
We counted things.

3 Results
There were many.

4 Discussion
Count more things.";

    #[test]
    fn groups_blocks_under_key_sections() {
        let outline = outline(PAPER);
        let kinds: Vec<SectionKind> = outline.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::General,
                SectionKind::Abstract,
                SectionKind::Introduction,
                SectionKind::Methods,
                SectionKind::Results,
                SectionKind::Conclusion,
            ]
        );
    }

    #[test]
    fn heading_line_dropped_and_followers_attached() {
        let outline = outline(PAPER);
        let intro = outline.section(SectionKind::Introduction).unwrap();
        assert_eq!(intro.blocks, vec!["Things matter.", "More on why things matter."]);
        assert_eq!(outline.section(SectionKind::General).unwrap().blocks, vec!["A Study of Things\nJ. Doe"]);
    }

    #[test]
    fn each_kind_opens_once() {
        let text = "Abstract\nFirst.\n\nAbstract\nSecond.";
        let outline = outline(text);
        assert_eq!(outline.sections.len(), 1);
        assert_eq!(outline.sections[0].blocks, vec!["First.", "Abstract\nSecond."]);
    }

    #[test]
    fn single_line_block_kept_whole() {
        let outline = outline("Summary of results");
        assert_eq!(outline.sections[0].kind, SectionKind::Abstract);
        assert_eq!(outline.sections[0].blocks, vec!["Summary of results"]);
    }

    #[test]
    fn seen_kind_falls_through_to_next_kind() {
        let text = "Abstract\nA.\n\nAbstract and conclusion\nB.";
        let kinds: Vec<SectionKind> = outline(text).sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SectionKind::Abstract, SectionKind::Conclusion]);
    }

    #[test]
    fn empty_text() {
        assert!(outline("  \n\n ").sections.is_empty());
    }
}
