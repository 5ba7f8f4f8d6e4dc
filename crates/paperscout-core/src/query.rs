//! Reduce long free-text queries to a bounded set of salient terms.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Queries at or under this many characters are passed through unchanged.
pub const MAX_QUERY_CHARS: usize = 200;

/// Default number of terms kept by [`normalize_query`].
pub const DEFAULT_MAX_TERMS: usize = 10;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
        "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers",
        "herself", "it", "its", "itself", "they", "them", "their", "theirs", "themselves",
        "what", "which", "who", "whom", "this", "that", "these", "those", "am", "is", "are",
        "was", "were", "be", "been", "being", "have", "has", "had", "having", "do", "does",
        "did", "doing", "a", "an", "the", "and", "but", "if", "or", "because", "as", "until",
        "while", "of", "at", "by", "for", "with", "about", "against", "between", "into",
        "through", "during", "before", "after", "above", "below", "to", "from", "up", "down",
        "in", "out", "on", "off", "over", "under", "again", "further", "then", "once", "here",
        "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
        "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so",
        "than", "too", "very", "s", "t", "can", "will", "just", "don", "should", "now", "d",
        "ll", "m", "o", "re", "ve", "y", "ain", "aren", "couldn", "didn", "doesn", "hadn",
        "hasn", "haven", "isn", "ma", "mightn", "mustn", "needn", "shan", "shouldn", "wasn",
        "weren", "won", "wouldn",
    ]
    .into_iter()
    .collect()
});

/// Normalize a search query for a repository API.
///
/// Queries of at most [`MAX_QUERY_CHARS`] characters are returned as-is.
/// Longer queries are lowercased and tokenized; stop words, punctuation and
/// tokens of two characters or fewer are dropped; the remaining tokens are
/// ranked by frequency (ties keep first-seen order) and the top `max_terms`
/// are joined with ` AND `.
///
/// Never fails: if no salient term survives, the raw query is truncated to
/// [`MAX_QUERY_CHARS`] characters instead.
pub fn normalize_query(query: &str, max_terms: usize) -> String {
    let char_count = query.chars().count();
    if char_count <= MAX_QUERY_CHARS {
        return query.to_string();
    }

    let key_terms = key_terms(query, max_terms);
    if key_terms.is_empty() {
        tracing::error!(
            chars = char_count,
            "no salient terms in query, falling back to truncation"
        );
        return truncate_chars(query, MAX_QUERY_CHARS);
    }

    let processed = key_terms.join(" AND ");
    tracing::info!(
        "Processed query from {} chars to {} chars",
        char_count,
        processed.chars().count()
    );
    tracing::debug!(terms = ?key_terms, "extracted key terms");
    processed
}

/// Rank salient tokens of `query` by frequency, ties broken by first occurrence.
fn key_terms(query: &str, max_terms: usize) -> Vec<String> {
    static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}]+").unwrap());

    let lowered = query.to_lowercase();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for token in TOKEN_RE.find_iter(&lowered).map(|m| m.as_str()) {
        if token.chars().count() <= 2 || STOP_WORDS.contains(token) {
            continue;
        }
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    // Stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .take(max_terms)
        .map(String::from)
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
