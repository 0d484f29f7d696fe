//! The ordered set of files under analysis and their per-file state machine.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::PaperAnalysis;
use crate::pipeline::BatchEvent;

pub const PDF_MIME: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Stable identity of a file within a batch. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing state of one file.
///
/// `Idle|Error -> Reading -> Analyzing -> Completed|Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Idle,
    Reading,
    Analyzing,
    Completed,
    Error,
}

impl FileStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Waiting",
            Self::Reading => "Reading...",
            Self::Analyzing => "Analyzing...",
            Self::Completed => "Done",
            Self::Error => "Failed",
        }
    }

    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (Self::Idle | Self::Error, Self::Reading)
                | (Self::Reading, Self::Analyzing)
                | (Self::Analyzing, Self::Completed | Self::Error)
        )
    }

    /// Picked up by the next batch-start.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Reading | Self::Analyzing)
    }
}

/// A user-supplied document.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, recognizing PDFs by extension or magic header.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let by_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        let mime_type = if by_extension || bytes.starts_with(PDF_MAGIC) {
            PDF_MIME
        } else {
            "application/octet-stream"
        };
        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME
    }
}

/// One entry of the batch.
#[derive(Debug, Clone)]
pub struct AnalyzedFile {
    pub id: FileId,
    pub source: SourceFile,
    pub status: FileStatus,
    /// Present only when `status` is `Completed`.
    pub result: Option<PaperAnalysis>,
    /// Present only when `status` is `Error`.
    pub error: Option<String>,
}

/// Outcome of [`Batch::add_files`].
#[derive(Debug, Default)]
pub struct IntakeReport {
    pub added: Vec<FileId>,
    /// Names of inputs that were not PDFs.
    pub rejected: Vec<String>,
}

/// Work item handed to the sequential runner.
#[derive(Debug, Clone)]
pub struct FileJob {
    pub id: FileId,
    pub name: String,
    pub bytes: Arc<[u8]>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("a file is still being analyzed")]
    Busy,
}

/// Ordered collection of files. Insertion order is display and export order.
#[derive(Debug, Default)]
pub struct Batch {
    files: Vec<AnalyzedFile>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every PDF in `sources` as `Idle`; other inputs are reported back.
    pub fn add_files(&mut self, sources: impl IntoIterator<Item = SourceFile>) -> IntakeReport {
        let mut report = IntakeReport::default();
        for source in sources {
            if !source.is_pdf() {
                tracing::info!(file = %source.name, mime = %source.mime_type, "skipping non-PDF input");
                report.rejected.push(source.name);
                continue;
            }
            let id = FileId::new();
            self.files.push(AnalyzedFile {
                id,
                source,
                status: FileStatus::Idle,
                result: None,
                error: None,
            });
            report.added.push(id);
        }
        report
    }

    /// Remove one entry. Returns `false` if `id` was not present.
    pub fn remove(&mut self, id: FileId) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.id != id);
        self.files.len() != before
    }

    /// Empty the batch, unless a file is in flight.
    pub fn clear_all(&mut self) -> Result<(), BatchError> {
        if self.is_busy() {
            return Err(BatchError::Busy);
        }
        self.files.clear();
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.files.iter().any(|f| f.status.is_in_flight())
    }

    pub fn files(&self) -> &[AnalyzedFile] {
        &self.files
    }

    pub fn get(&self, id: FileId) -> Option<&AnalyzedFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Jobs for every `Idle` or `Error` entry, in batch order.
    pub fn pending_jobs(&self) -> Vec<FileJob> {
        self.files
            .iter()
            .filter(|f| f.status.is_pending())
            .map(|f| FileJob {
                id: f.id,
                name: f.source.name.clone(),
                bytes: Arc::clone(&f.source.bytes),
            })
            .collect()
    }

    /// Results of every `Completed` entry, in batch order.
    pub fn completed_results(&self) -> Vec<&PaperAnalysis> {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Completed)
            .filter_map(|f| f.result.as_ref())
            .collect()
    }

    /// Completed entries paired with their source file name.
    pub fn completed(&self) -> impl Iterator<Item = (&SourceFile, &PaperAnalysis)> {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Completed)
            .filter_map(|f| f.result.as_ref().map(|r| (&f.source, r)))
    }

    /// Apply a runner event. Returns `true` if an entry changed.
    ///
    /// Events for removed files and invalid transitions are dropped.
    pub fn apply(&mut self, event: &BatchEvent) -> bool {
        let (id, next) = match event {
            BatchEvent::Reading { id } => (*id, FileStatus::Reading),
            BatchEvent::Analyzing { id } => (*id, FileStatus::Analyzing),
            BatchEvent::Completed { id, .. } => (*id, FileStatus::Completed),
            BatchEvent::Failed { id, .. } => (*id, FileStatus::Error),
            BatchEvent::BatchComplete(_) => return false,
        };

        let Some(file) = self.files.iter_mut().find(|f| f.id == id) else {
            tracing::debug!(%id, "discarding event for a file no longer in the batch");
            return false;
        };

        if !file.status.can_transition_to(next) {
            tracing::warn!(
                %id,
                from = ?file.status,
                to = ?next,
                "ignoring invalid status transition"
            );
            return false;
        }

        file.status = next;
        match event {
            BatchEvent::Reading { .. } => {
                file.result = None;
                file.error = None;
            }
            BatchEvent::Completed { result, .. } => {
                file.result = Some(result.as_ref().clone());
                file.error = None;
            }
            BatchEvent::Failed { error, .. } => {
                file.result = None;
                file.error = Some(error.clone());
            }
            _ => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_analysis;

    fn pdf(name: &str) -> SourceFile {
        SourceFile::new(name, PDF_MIME, b"%PDF-1.4".to_vec())
    }

    fn run_to(batch: &mut Batch, id: FileId, outcome: Result<&str, &str>) {
        batch.apply(&BatchEvent::Reading { id });
        batch.apply(&BatchEvent::Analyzing { id });
        let event = match outcome {
            Ok(title) => BatchEvent::Completed {
                id,
                result: Box::new(sample_analysis(title)),
            },
            Err(error) => BatchEvent::Failed {
                id,
                error: error.to_string(),
            },
        };
        assert!(batch.apply(&event));
    }

    #[test]
    fn intake_keeps_order_and_rejects_non_pdfs() {
        let mut batch = Batch::new();
        let report = batch.add_files(vec![
            pdf("a.pdf"),
            SourceFile::new("notes.txt", "text/plain", b"hi".to_vec()),
            pdf("b.pdf"),
        ]);
        assert_eq!(report.added.len(), 2);
        assert_eq!(report.rejected, vec!["notes.txt".to_string()]);
        let names: Vec<_> = batch.files().iter().map(|f| f.source.name.as_str()).collect();
        assert_eq!(names, ["a.pdf", "b.pdf"]);
        assert!(batch.files().iter().all(|f| f.status == FileStatus::Idle
            && f.result.is_none()
            && f.error.is_none()));
    }

    #[test]
    fn ids_are_unique() {
        let mut batch = Batch::new();
        let report = batch.add_files(vec![pdf("same.pdf"), pdf("same.pdf")]);
        assert_ne!(report.added[0], report.added[1]);
    }

    #[test]
    fn from_path_detects_pdf_by_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.bin");
        std::fs::write(&path, b"%PDF-1.7\n...").unwrap();
        let source = SourceFile::from_path(&path).unwrap();
        assert_eq!(source.name, "paper.bin");
        assert!(source.is_pdf());

        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"plain").unwrap();
        assert!(!SourceFile::from_path(&path).unwrap().is_pdf());
    }

    #[test]
    fn remove_absent_id_is_noop() {
        let mut batch = Batch::new();
        batch.add_files(vec![pdf("a.pdf")]);
        assert!(!batch.remove(FileId::new()));
        assert_eq!(batch.len(), 1);
        let id = batch.files()[0].id;
        assert!(batch.remove(id));
        assert!(batch.is_empty());
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        use FileStatus::*;
        assert!(Idle.can_transition_to(Reading));
        assert!(Error.can_transition_to(Reading));
        assert!(Reading.can_transition_to(Analyzing));
        assert!(Analyzing.can_transition_to(Completed));
        assert!(Analyzing.can_transition_to(Error));
        assert!(!Idle.can_transition_to(Analyzing));
        assert!(!Completed.can_transition_to(Reading));
        assert!(!Reading.can_transition_to(Completed));
    }

    #[test]
    fn invalid_event_is_ignored() {
        let mut batch = Batch::new();
        let id = batch.add_files(vec![pdf("a.pdf")]).added[0];
        let changed = batch.apply(&BatchEvent::Completed {
            id,
            result: Box::new(sample_analysis("Skipped")),
        });
        assert!(!changed);
        let file = batch.get(id).unwrap();
        assert_eq!(file.status, FileStatus::Idle);
        assert!(file.result.is_none());
    }

    #[test]
    fn result_and_error_are_exclusive() {
        let mut batch = Batch::new();
        let report = batch.add_files(vec![pdf("ok.pdf"), pdf("bad.pdf")]);
        run_to(&mut batch, report.added[0], Ok("Good Paper"));
        run_to(&mut batch, report.added[1], Err("API error 429 - slow down"));

        let ok = batch.get(report.added[0]).unwrap();
        assert_eq!(ok.status, FileStatus::Completed);
        assert!(ok.result.is_some() && ok.error.is_none());

        let bad = batch.get(report.added[1]).unwrap();
        assert_eq!(bad.status, FileStatus::Error);
        assert!(bad.result.is_none());
        assert_eq!(bad.error.as_deref(), Some("API error 429 - slow down"));
    }

    #[test]
    fn rerun_clears_previous_error() {
        let mut batch = Batch::new();
        let id = batch.add_files(vec![pdf("a.pdf")]).added[0];
        run_to(&mut batch, id, Err("boom"));
        assert!(batch.apply(&BatchEvent::Reading { id }));
        let file = batch.get(id).unwrap();
        assert_eq!(file.status, FileStatus::Reading);
        assert!(file.error.is_none());
    }

    #[test]
    fn pending_jobs_skip_completed() {
        let mut batch = Batch::new();
        let report = batch.add_files(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")]);
        run_to(&mut batch, report.added[0], Ok("A"));
        run_to(&mut batch, report.added[1], Err("boom"));
        let ids: Vec<_> = batch.pending_jobs().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![report.added[1], report.added[2]]);
    }

    #[test]
    fn clear_all_refused_while_in_flight() {
        let mut batch = Batch::new();
        let id = batch.add_files(vec![pdf("a.pdf")]).added[0];
        batch.apply(&BatchEvent::Reading { id });
        batch.apply(&BatchEvent::Analyzing { id });
        assert_eq!(batch.clear_all(), Err(BatchError::Busy));
        assert_eq!(batch.len(), 1);

        batch.apply(&BatchEvent::Failed {
            id,
            error: "x".into(),
        });
        assert_eq!(batch.clear_all(), Ok(()));
        assert!(batch.is_empty());
    }

    #[test]
    fn completed_results_follow_batch_order() {
        let mut batch = Batch::new();
        let report = batch.add_files(vec![pdf("1.pdf"), pdf("2.pdf"), pdf("3.pdf")]);
        run_to(&mut batch, report.added[2], Ok("Third"));
        run_to(&mut batch, report.added[1], Err("boom"));
        run_to(&mut batch, report.added[0], Ok("First"));
        let titles: Vec<_> = batch
            .completed_results()
            .iter()
            .map(|r| r.basic_info.title.as_str())
            .collect();
        assert_eq!(titles, ["First", "Third"]);
    }
}
