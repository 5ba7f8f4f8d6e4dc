//! Map a free-text instruction onto one of the agent's operations.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Empty instruction, or one whose operation is missing its argument.
    #[error("{0}")]
    InvalidTask(String),
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),
}

impl TaskError {
    fn invalid(msg: &str) -> Self {
        TaskError::InvalidTask(msg.to_string())
    }
}

/// A routed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Find papers on a topic (lowercased).
    Search { topic: String },
    /// Download a document and extract its text.
    Read { url: String },
    /// Extract citations from the text following the first colon.
    ExtractCitations { text: String },
}

/// Route `task` by keyword. Rules are tried in order: search, read, citations.
///
/// - `search` together with `paper` or `research`: topic is the text after
///   `about `, else the instruction minus the words `search` and `papers`.
/// - `download`, `summarize` or `read`: the first token starting with
///   `http`, up to the next space, trailing `.,;` removed.
/// - `citation` or `reference`: everything after the first `:`.
pub fn parse_task(task: &str) -> Result<Task, TaskError> {
    static ABOUT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"about (.+)").unwrap());

    let lower = task.trim().to_lowercase();
    if lower.is_empty() {
        return Err(TaskError::invalid("Invalid task: must be a non-empty string"));
    }

    if lower.contains("search") && (lower.contains("paper") || lower.contains("research")) {
        let topic = match ABOUT_RE.captures(&lower).and_then(|c| c.get(1)) {
            Some(m) => m.as_str().trim().to_string(),
            None => lower.replace("search", "").replace("papers", "").trim().to_string(),
        };
        return Ok(Task::Search { topic });
    }

    if ["download", "summarize", "read"].iter().any(|w| lower.contains(w)) {
        let start = task
            .find("http")
            .ok_or_else(|| TaskError::invalid("No URL found in task"))?;
        let rest = &task[start..];
        let end = rest.find(' ').unwrap_or(rest.len());
        let url = rest[..end].trim_end_matches(['.', ',', ';']);
        if url.is_empty() {
            return Err(TaskError::invalid("Invalid URL in task"));
        }
        return Ok(Task::Read {
            url: url.to_string(),
        });
    }

    if lower.contains("citation") || lower.contains("reference") {
        let (_, text) = task
            .split_once(':')
            .ok_or_else(|| TaskError::invalid("No text provided for citation extraction"))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::invalid("Empty text for citation extraction"));
        }
        return Ok(Task::ExtractCitations {
            text: text.to_string(),
        });
    }

    Err(TaskError::UnknownTaskType(task.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_topic_after_about() {
        assert_eq!(
            parse_task("search papers about dark matter"),
            Ok(Task::Search {
                topic: "dark matter".into()
            })
        );
    }

    #[test]
    fn search_topic_is_lowercased() {
        assert_eq!(
            parse_task("Search research about Graph Neural Networks "),
            Ok(Task::Search {
                topic: "graph neural networks".into()
            })
        );
    }

    #[test]
    fn search_topic_without_about() {
        assert_eq!(
            parse_task("search papers quantum error correction"),
            Ok(Task::Search {
                topic: "quantum error correction".into()
            })
        );
    }

    #[test]
    fn search_needs_paper_or_research() {
        assert!(matches!(
            parse_task("search the web for cats"),
            Err(TaskError::UnknownTaskType(_))
        ));
    }

    #[test]
    fn read_extracts_url() {
        assert_eq!(
            parse_task("download and summarize this paper: https://arxiv.org/pdf/2403.01234.pdf."),
            Ok(Task::Read {
                url: "https://arxiv.org/pdf/2403.01234.pdf".into()
            })
        );
    }

    #[test]
    fn read_url_stops_at_space_and_keeps_case() {
        assert_eq!(
            parse_task("Read https://Example.org/A.pdf, then rest"),
            Ok(Task::Read {
                url: "https://Example.org/A.pdf".into()
            })
        );
    }

    #[test]
    fn read_without_url() {
        assert_eq!(
            parse_task("read this paper please"),
            Err(TaskError::InvalidTask("No URL found in task".into()))
        );
    }

    #[test]
    fn read_wins_over_citation() {
        // "reference" is present, but the read rule is tried first
        assert!(matches!(
            parse_task("read the reference list at https://x.org/p.pdf"),
            Ok(Task::Read { .. })
        ));
    }

    #[test]
    fn citation_text_after_first_colon() {
        assert_eq!(
            parse_task("extract citations: Smith (2020) argued..."),
            Ok(Task::ExtractCitations {
                text: "Smith (2020) argued...".into()
            })
        );
        assert_eq!(
            parse_task("find references: see [1]: details"),
            Ok(Task::ExtractCitations {
                text: "see [1]: details".into()
            })
        );
    }

    #[test]
    fn citation_errors() {
        assert_eq!(
            parse_task("extract citations from this"),
            Err(TaskError::InvalidTask("No text provided for citation extraction".into()))
        );
        assert_eq!(
            parse_task("extract citations:   "),
            Err(TaskError::InvalidTask("Empty text for citation extraction".into()))
        );
    }

    #[test]
    fn empty_task_is_invalid() {
        for task in ["", "   \n"] {
            assert_eq!(
                parse_task(task),
                Err(TaskError::InvalidTask("Invalid task: must be a non-empty string".into()))
            );
        }
    }

    #[test]
    fn unknown_task_echoes_input() {
        let err = parse_task("make coffee").unwrap_err();
        assert_eq!(err.to_string(), "Unknown task type: make coffee");
    }
}
