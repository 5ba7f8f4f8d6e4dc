use std::io::Write;

use owo_colors::OwoColorize;
use paperscout_citations::CitationDigest;
use paperscout_core::{ExtractionReport, Paper};
use paperscout_reader::{Outline, SectionKind};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

const RULE_WIDTH: usize = 80;

/// Print a `====` framed banner.
pub fn print_banner(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(w)?;
    writeln!(w, "{}", rule)?;
    if color.enabled() {
        writeln!(w, "{}", title.bold())?;
    } else {
        writeln!(w, "{}", title)?;
    }
    writeln!(w, "{}", rule)?;
    Ok(())
}

/// Print search hits as a numbered list.
pub fn print_papers(w: &mut dyn Write, papers: &[Paper], color: ColorMode) -> std::io::Result<()> {
    if papers.is_empty() {
        writeln!(w, "No papers found.")?;
        return Ok(());
    }

    for (i, paper) in papers.iter().enumerate() {
        let idx = i + 1;
        if color.enabled() {
            writeln!(w, "{}. {}", idx, paper.title.bold())?;
        } else {
            writeln!(w, "{}. {}", idx, paper.title)?;
        }

        let authors = if paper.authors.len() > 3 {
            format!("{} et al.", paper.authors[..3].join(", "))
        } else {
            paper.authors.join(", ")
        };
        writeln!(w, "   Authors:   {}", authors)?;
        let published = paper.published.get(..10).unwrap_or(&paper.published);
        writeln!(w, "   Published: {}", published)?;
        if let Some(doi) = &paper.doi {
            writeln!(w, "   DOI:       {}", doi)?;
        }
        if color.enabled() {
            writeln!(w, "   PDF:       {}", paper.pdf_url.cyan())?;
        } else {
            writeln!(w, "   PDF:       {}", paper.pdf_url)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Print the key sections of a paper.
pub fn print_outline(w: &mut dyn Write, outline: &Outline, color: ColorMode) -> std::io::Result<()> {
    if outline.sections.is_empty() {
        writeln!(w, "No text to outline.")?;
        return Ok(());
    }

    for section in &outline.sections {
        writeln!(w)?;
        let label = section.kind.label();
        match (color.enabled(), section.kind) {
            (true, SectionKind::General) => writeln!(w, "{}", label.dimmed())?,
            (true, _) => writeln!(w, "{}", label.yellow().bold())?,
            (false, _) => writeln!(w, "{}", label)?,
        }
        writeln!(w, "{}", "-".repeat(40))?;
        for block in &section.blocks {
            writeln!(w, "{}", block)?;
        }
    }
    Ok(())
}

/// Print inline citations grouped by number and by author.
pub fn print_citations(
    w: &mut dyn Write,
    report: &ExtractionReport,
    color: ColorMode,
) -> std::io::Result<()> {
    if let Some(error) = &report.error {
        if color.enabled() {
            writeln!(w, "{} {}", "Error extracting citations:".red(), error)?;
        } else {
            writeln!(w, "Error extracting citations: {}", error)?;
        }
        return Ok(());
    }

    let digest = CitationDigest::from_citations(&report.citations);
    if digest.is_empty() {
        writeln!(w, "No citations found in the text.")?;
        return Ok(());
    }

    if !digest.numbers.is_empty() {
        writeln!(w)?;
        if color.enabled() {
            writeln!(w, "{}", "Numerical citations:".bold())?;
        } else {
            writeln!(w, "Numerical citations:")?;
        }
        for group in &digest.numbers {
            writeln!(w, "[{}] ({} occurrences)", group.number, group.occurrences())?;
        }
    }

    if !digest.named.is_empty() {
        writeln!(w)?;
        if color.enabled() {
            writeln!(w, "{}", "Author citations:".bold())?;
        } else {
            writeln!(w, "Author citations:")?;
        }
        for (i, mention) in digest.named.iter().enumerate() {
            writeln!(w, "{}. {}", i + 1, mention)?;
        }
    }

    let references = report
        .citations
        .iter()
        .filter(|c| c.citation_type == paperscout_core::CitationType::Reference)
        .count();
    if references > 0 {
        let line = format!("({} more found in the reference list)", references);
        if color.enabled() {
            writeln!(w, "\n{}", line.dimmed())?;
        } else {
            writeln!(w, "\n{}", line)?;
        }
    }
    Ok(())
}

/// Print an error line, red when colored.
pub fn print_error(w: &mut dyn Write, msg: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "Error:".red().bold(), msg)
    } else {
        writeln!(w, "Error: {}", msg)
    }
}
