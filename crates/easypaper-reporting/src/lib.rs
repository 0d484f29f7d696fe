//! Export formatters for analyzed papers.
//!
//! Every formatter is a pure transform from [`PaperAnalysis`] to bytes;
//! [`write_artifact`] is the only function that touches the filesystem.

pub mod document;
pub mod markdown;
pub mod spreadsheet;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use easypaper_core::PaperAnalysis;
use thiserror::Error;

pub use spreadsheet::BATCH_EXPORT_FILENAME;

/// Available export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Markdown,
    Excel,
    Pdf,
}

impl ExportFormat {
    pub fn all() -> &'static [ExportFormat] {
        &[ExportFormat::Markdown, ExportFormat::Excel, ExportFormat::Pdf]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Markdown => "Markdown",
            Self::Excel => "Excel",
            Self::Pdf => "PDF",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Excel => "xlsx",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(Self::Markdown),
            "xlsx" | "excel" => Ok(Self::Excel),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!(
                "unknown export format '{}' (expected md, xlsx or pdf)",
                other
            )),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("spreadsheet export failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("PDF export failed: {0}")]
    Document(#[from] lopdf::Error),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered export, ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Drop the last extension of a file name, if any.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

/// `paper.pdf` becomes `paper_summary.<ext>`.
pub fn export_filename(source_name: &str, format: ExportFormat) -> String {
    format!(
        "{}_summary.{}",
        strip_extension(source_name),
        format.extension()
    )
}

/// Render one analysis in `format`.
pub fn export_single(
    analysis: &PaperAnalysis,
    source_name: &str,
    format: ExportFormat,
) -> Result<ExportArtifact, ExportError> {
    let bytes = match format {
        ExportFormat::Markdown => markdown::render(analysis).into_bytes(),
        ExportFormat::Excel => spreadsheet::to_xlsx(&[analysis])?,
        ExportFormat::Pdf => document::render(analysis)?,
    };
    Ok(ExportArtifact {
        filename: export_filename(source_name, format),
        bytes,
    })
}

/// One workbook for every completed analysis, in the given order.
///
/// Returns `None` when there is nothing to export.
pub fn export_batch(analyses: &[&PaperAnalysis]) -> Result<Option<ExportArtifact>, ExportError> {
    if analyses.is_empty() {
        return Ok(None);
    }
    Ok(Some(ExportArtifact {
        filename: BATCH_EXPORT_FILENAME.to_string(),
        bytes: spreadsheet::to_xlsx(analyses)?,
    }))
}

/// Save `artifact` under `dir`, creating the directory if needed.
pub fn write_artifact(dir: &Path, artifact: &ExportArtifact) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.filename);
    std::fs::write(&path, &artifact.bytes)?;
    tracing::debug!(path = %path.display(), bytes = artifact.bytes.len(), "export written");
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::*;
    use fixtures::analysis;

    #[test]
    fn filename_replaces_last_extension() {
        assert_eq!(
            export_filename("deep.learning.pdf", ExportFormat::Markdown),
            "deep.learning_summary.md"
        );
        assert_eq!(
            export_filename("paper", ExportFormat::Pdf),
            "paper_summary.pdf"
        );
        assert_eq!(
            export_filename("Paper.PDF", ExportFormat::Excel),
            "Paper_summary.xlsx"
        );
    }

    #[test]
    fn format_parses_from_extension_or_name() {
        assert_eq!("md".parse::<ExportFormat>(), Ok(ExportFormat::Markdown));
        assert_eq!("Excel".parse::<ExportFormat>(), Ok(ExportFormat::Excel));
        assert_eq!(" pdf ".parse::<ExportFormat>(), Ok(ExportFormat::Pdf));
        assert!("docx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn empty_batch_exports_nothing() {
        assert!(export_batch(&[]).unwrap().is_none());
    }

    #[test]
    fn batch_uses_constant_filename() {
        let a = analysis("A");
        let b = analysis("B");
        let artifact = export_batch(&[&a, &b]).unwrap().unwrap();
        assert_eq!(artifact.filename, "EasyPaper_Batch_Export.xlsx");
        assert!(artifact.bytes.starts_with(b"PK"));
    }

    #[test]
    fn single_export_is_named_after_source() {
        let artifact =
            export_single(&analysis("A"), "survey.pdf", ExportFormat::Markdown).unwrap();
        assert_eq!(artifact.filename, "survey_summary.md");
        assert!(String::from_utf8(artifact.bytes).unwrap().starts_with("# A"));
    }

    #[test]
    fn library_errors_keep_their_source() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let err: ExportError = workbook
            .add_worksheet()
            .set_name("bad[name]")
            .err()
            .unwrap()
            .into();
        assert!(matches!(err, ExportError::Spreadsheet(_)));
        assert!(err.to_string().starts_with("spreadsheet export failed"));

        let err: ExportError = lopdf::Document::load_mem(b"not a pdf").err().unwrap().into();
        assert!(matches!(err, ExportError::Document(_)));
    }

    #[test]
    fn write_artifact_into_a_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"").unwrap();
        let artifact = ExportArtifact {
            filename: "x_summary.md".into(),
            bytes: b"# x".to_vec(),
        };
        let err = write_artifact(&blocker, &artifact).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[test]
    fn write_artifact_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exports");
        let artifact = ExportArtifact {
            filename: "x_summary.md".into(),
            bytes: b"# x".to_vec(),
        };
        let path = write_artifact(&out, &artifact).unwrap();
        assert_eq!(path, out.join("x_summary.md"));
        assert_eq!(std::fs::read(path).unwrap(), b"# x");
    }
}
