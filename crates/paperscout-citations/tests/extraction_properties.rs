use std::collections::HashSet;

use chrono::Datelike;
use paperscout_citations::{
    Citation, CitationConfigBuilder, CitationExtractor, CitationType, ClassifierMode,
    extract_citations, find_references_section, process_text,
};

const PAPER: &str = "\
Introduction

Transformers [1] replaced recurrence [2,3]. Vaswani et al. (2017) introduced attention,
while Hochreiter and Schmidhuber (1997) proposed the LSTM. See also (Bengio, 2003) and
the survey by Lipton (2015, p. 12). Chen et al. (2020a) extend this, as do [Rad19] and (4).

References
[1] A. Vaswani et al. Attention is all you need. 2017.
[2] S. Hochreiter, J. Schmidhuber. Long short-term memory. (1997).
[3] Bengio, Y. (2003). A neural probabilistic language model.

Appendix
Extra material [9].";

fn keys(citations: &[Citation]) -> Vec<paperscout_citations::DedupKey> {
    citations.iter().map(Citation::dedup_key).collect()
}

#[test]
fn bracketed_scenario() {
    let citations = extract_citations("See [1] and [2,3] for details.");
    assert_eq!(citations.len(), 3);
    let numbers: Vec<&str> = citations.iter().filter_map(|c| c.number()).collect();
    assert_eq!(numbers, vec!["1", "2", "3"]);
    assert!(citations.iter().all(|c| c.is_numerical()));
    assert!(citations.iter().all(|c| c.citation_type == CitationType::Inline));
}

#[test]
fn author_year_with_references_scenario() {
    let citations =
        extract_citations("Smith (2020) showed X. \n\nReferences\nSmith, J. (2020). Title.");
    assert!(citations
        .iter()
        .any(|c| c.author_name() == Some("Smith") && c.year() == Some("2020")));
    assert!(citations.iter().any(|c| c.citation_type == CitationType::Reference));
}

#[test]
fn empty_text_scenario() {
    let report = process_text("");
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"success": false, "citations": [], "error": "Empty text provided"})
    );
}

#[test]
fn extraction_is_idempotent() {
    let extractor = CitationExtractor::new();
    assert_eq!(extractor.extract(PAPER), extractor.extract(PAPER));
}

#[test]
fn no_duplicate_dedup_keys() {
    let citations = extract_citations(PAPER);
    let keys = keys(&citations);
    let unique: HashSet<_> = keys.iter().cloned().collect();
    assert_eq!(unique.len(), keys.len());
}

#[test]
fn named_years_within_bounds() {
    let max = chrono::Utc::now().year() + 1;
    let text = format!("{PAPER}\nMorgan (1750) and Future ({}) and Kim (2019b).", max + 5);
    for citation in extract_citations(&text) {
        if let Some(year) = citation.year() {
            let digits: i32 = year.trim_end_matches(|c: char| c.is_ascii_lowercase()).parse().unwrap();
            assert!((1800..=max).contains(&digits), "{year} out of range");
        }
    }
}

#[test]
fn reference_records_lie_inside_references_section() {
    let section = find_references_section(PAPER).unwrap();
    let start = section.offset;
    let end = section.offset + section.text.len();
    let citations = extract_citations(PAPER);

    let references: Vec<_> = citations
        .iter()
        .filter(|c| c.citation_type == CitationType::Reference)
        .collect();
    assert!(!references.is_empty());
    for c in references {
        assert!(c.span.start >= start && c.span.end <= end, "{c:?}");
    }

    // Appendix text after the blank line is outside the section
    assert!(!section.text.contains("[9]"));
    assert!(citations
        .iter()
        .any(|c| c.number() == Some("9") && c.citation_type == CitationType::Inline));
}

#[test]
fn inline_before_reference_in_output_order() {
    let citations = extract_citations(PAPER);
    let first_reference = citations
        .iter()
        .position(|c| c.citation_type == CitationType::Reference)
        .unwrap();
    assert!(citations[first_reference..]
        .iter()
        .all(|c| c.citation_type == CitationType::Reference));
}

#[test]
fn recognizes_each_named_family() {
    let citations = extract_citations(PAPER);
    let named: Vec<String> = citations
        .iter()
        .filter(|c| c.citation_type == CitationType::Inline)
        .filter_map(|c| match (c.author_name(), c.authors(), c.year()) {
            (Some(a), _, Some(y)) => Some(format!("{a} {y}")),
            (_, Some([a, b]), Some(y)) => Some(format!("{a}+{b} {y}")),
            _ => None,
        })
        .collect();

    assert!(named.contains(&"Vaswani 2017".to_string()), "{named:?}");
    assert!(named.contains(&"Hochreiter+Schmidhuber 1997".to_string()), "{named:?}");
    assert!(named.contains(&"Chen 2020a".to_string()), "{named:?}");
    assert!(named.contains(&"Lipton 2015".to_string()), "{named:?}");
}

#[test]
fn alphanumeric_key_is_numerical_bucket() {
    let citations = extract_citations("as shown in [Rad19].");
    assert_eq!(citations.len(), 1);
    assert_eq!(citations[0].citation_text(), Some("[Rad19]"));
    assert_eq!(citations[0].number(), Some("19"));
}

#[test]
fn classifier_modes_differ_only_on_parenthetical_author_rules() {
    let text = "Known (Bengio, 2003) and Lipton (2015).";
    let compat = extract_citations(text);
    let shape_only = CitationExtractor::with_config(
        CitationConfigBuilder::new()
            .classifier(ClassifierMode::ShapeOnly)
            .build()
            .unwrap(),
    )
    .extract(text);

    assert!(compat.iter().all(|c| c.author_name() != Some("Bengio")));
    assert!(compat.iter().any(|c| c.citation_text() == Some("(Bengio, 2003)")));
    assert!(shape_only.iter().any(|c| c.author_name() == Some("Bengio")));

    for citations in [&compat, &shape_only] {
        assert!(citations.iter().any(|c| c.author_name() == Some("Lipton")));
    }
}

#[test]
fn context_is_bounded_window() {
    let filler = "0".repeat(200);
    let text = format!("{filler} [5] {filler}");
    let citations = extract_citations(&text);
    assert_eq!(citations.len(), 1);
    // The annotated-bracket rule swallows the trailing space: match is "[5] "
    assert_eq!(citations[0].context.chars().count(), 50 + 4 + 50);
}

#[test]
fn concurrent_callers_share_one_extractor() {
    let extractor = std::sync::Arc::new(CitationExtractor::new());
    let expected = extractor.extract(PAPER);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let extractor = extractor.clone();
            std::thread::spawn(move || extractor.extract(PAPER))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
