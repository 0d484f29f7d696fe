use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
}

/// Trait for PDF text extraction backends.
///
/// Implementors return the raw text of every page, in page order. Page
/// markers and the empty-document check live in [`crate::extract`].
pub trait PdfBackend: Send + Sync {
    /// Extract the text of each page of an in-memory PDF.
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<String>, BackendError>;
}
