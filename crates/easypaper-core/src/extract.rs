//! Page-marked plain text extraction for providers that take text input.

use crate::{AnalysisError, PdfBackend};

/// Concatenate the text of every page, each prefixed with `--- Page N ---`.
///
/// Fails when the backend cannot parse the document, or when no page holds
/// any non-whitespace text (scanned or image-only PDFs are not supported).
pub fn extract_text(backend: &dyn PdfBackend, pdf: &[u8]) -> Result<String, AnalysisError> {
    let pages = backend.extract_pages(pdf)?;

    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(AnalysisError::Extraction(
            "no extractable text; the file might be scanned images".into(),
        ));
    }

    let mut full_text = String::new();
    for (i, page) in pages.iter().enumerate() {
        full_text.push_str(&format!("--- Page {} ---\n{}\n\n", i + 1, page.trim_end()));
    }

    tracing::debug!(pages = pages.len(), chars = full_text.len(), "extracted PDF text");
    Ok(full_text)
}
