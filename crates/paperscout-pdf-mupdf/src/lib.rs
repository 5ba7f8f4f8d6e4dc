use mupdf::{Document, Page, TextPageFlags};

use paperscout_core::{BackendError, DocumentBackend};

/// MuPDF-based implementation of [`DocumentBackend`].
///
/// This crate isolates the mupdf dependency (AGPL-3.0) so that the rest of
/// the workspace does not link it.
///
/// Running headers and footers can optionally be cut by excluding text
/// blocks in the top and bottom bands of each page. Both are off by default
/// so that the full page text reaches the citation extractor.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend {
    /// Fraction of page height from bottom to exclude as footer (0.0–1.0).
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height from top to exclude as header (0.0–1.0).
    header_exclusion_ratio: Option<f32>,
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the footer exclusion ratio. Pass `0.0` to disable.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = (ratio > 0.0).then_some(ratio);
        self
    }

    /// Set the header exclusion ratio. Pass `0.0` to disable.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = (ratio > 0.0).then_some(ratio);
        self
    }

    fn page_text(&self, page: &Page) -> Result<String, mupdf::Error> {
        let text_page = page.to_text_page(TextPageFlags::empty())?;

        let bounds = page.bounds()?;
        let height = bounds.y1 - bounds.y0;
        let header_threshold = self.header_exclusion_ratio.map(|r| bounds.y0 + height * r);
        let footer_threshold = self.footer_exclusion_ratio.map(|r| bounds.y1 - height * r);

        let mut text = String::new();
        for block in text_page.blocks() {
            let block_bounds = block.bounds();
            if header_threshold.is_some_and(|t| block_bounds.y1 <= t) {
                continue;
            }
            if footer_threshold.is_some_and(|t| block_bounds.y0 >= t) {
                continue;
            }
            for line in block.lines() {
                text.extend(line.chars().map(|c| c.char().unwrap_or('\u{FFFD}')));
                text.push('\n');
            }
        }
        Ok(text)
    }
}

impl DocumentBackend for MupdfBackend {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, BackendError> {
        let document = Document::from_bytes(bytes, "application/pdf")
            .map_err(|e| BackendError::OpenError(e.to_string()))?;

        let mut pages = Vec::new();
        for (index, page_result) in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
            .enumerate()
        {
            let text = page_result.and_then(|page| self.page_text(&page));
            match text {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "failed to extract page text");
                    pages.push(String::new());
                }
            }
        }

        tracing::debug!(pages = pages.len(), "extracted document pages");
        Ok(pages)
    }
}
