//! Sequential batch runner and the orchestrator that owns the [`Batch`].
//!
//! The runner never touches the batch directly: it emits [`BatchEvent`]s over
//! an mpsc channel and the owner of the batch applies them. Files are
//! processed strictly one at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::batch::FileJob;
use crate::config::PipelineOptions;
use crate::{AnalysisError, Batch, BatchError, FileId, PaperAnalysis, PaperAnalyzer, SourceFile};
use crate::{IntakeReport, providers::DocumentPayload};

/// Events emitted by [`run_batch`].
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Reading { id: FileId },
    Analyzing { id: FileId },
    Completed { id: FileId, result: Box<PaperAnalysis> },
    Failed { id: FileId, error: String },
    /// Every job has been processed or skipped.
    BatchComplete(BatchSummary),
}

impl BatchEvent {
    pub fn file_id(&self) -> Option<FileId> {
        match self {
            Self::Reading { id }
            | Self::Analyzing { id }
            | Self::Completed { id, .. }
            | Self::Failed { id, .. } => Some(*id),
            Self::BatchComplete(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    /// Jobs never started because the batch was cancelled.
    pub cancelled: usize,
}

/// Process `jobs` one after another, reporting progress on `tx`.
///
/// A failing file is reported and the loop moves on. Cancellation is checked
/// between files; a file already started always runs to completion.
pub async fn run_batch<A>(
    jobs: Vec<FileJob>,
    analyzer: Arc<A>,
    reading_delay: Duration,
    tx: mpsc::UnboundedSender<BatchEvent>,
    cancel: CancellationToken,
) -> BatchSummary
where
    A: PaperAnalyzer + ?Sized + 'static,
{
    let total = jobs.len();
    let mut summary = BatchSummary::default();

    for (i, job) in jobs.into_iter().enumerate() {
        if cancel.is_cancelled() {
            summary.cancelled = total - i;
            tracing::info!(remaining = summary.cancelled, "batch cancelled");
            break;
        }

        let id = job.id;
        let _ = tx.send(BatchEvent::Reading { id });
        if !reading_delay.is_zero() {
            tokio::time::sleep(reading_delay).await;
        }
        let _ = tx.send(BatchEvent::Analyzing { id });

        match analyze_one(&analyzer, &job).await {
            Ok(result) => {
                summary.completed += 1;
                tracing::info!(file = %job.name, provider = analyzer.name(), "analysis completed");
                let _ = tx.send(BatchEvent::Completed {
                    id,
                    result: Box::new(result),
                });
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(file = %job.name, provider = analyzer.name(), error = %e, "analysis failed");
                let _ = tx.send(BatchEvent::Failed {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }

    let _ = tx.send(BatchEvent::BatchComplete(summary));
    summary
}

async fn analyze_one<A>(analyzer: &Arc<A>, job: &FileJob) -> Result<PaperAnalysis, AnalysisError>
where
    A: PaperAnalyzer + ?Sized + 'static,
{
    // MuPDF extraction is synchronous and CPU-bound; the runner still awaits it
    // before touching the next file.
    let preparer = Arc::clone(analyzer);
    let bytes = Arc::clone(&job.bytes);
    let payload: DocumentPayload = tokio::task::spawn_blocking(move || preparer.prepare(&bytes))
        .await
        .map_err(|e| AnalysisError::Extraction(format!("extraction task failed: {}", e)))??;

    tracing::debug!(
        file = %job.name,
        payload = payload.kind(),
        size = payload.len(),
        "document prepared"
    );
    analyzer.analyze(&payload).await
}

/// Owns a [`Batch`] and drives batch-starts against one analyzer.
pub struct Orchestrator<A: PaperAnalyzer + ?Sized + 'static> {
    batch: Batch,
    analyzer: Arc<A>,
    options: PipelineOptions,
}

impl<A: PaperAnalyzer + ?Sized + 'static> Orchestrator<A> {
    pub fn new(analyzer: Arc<A>, options: PipelineOptions) -> Self {
        Self {
            batch: Batch::new(),
            analyzer,
            options,
        }
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn add_files(&mut self, sources: impl IntoIterator<Item = SourceFile>) -> IntakeReport {
        self.batch.add_files(sources)
    }

    pub fn remove(&mut self, id: FileId) -> bool {
        self.batch.remove(id)
    }

    pub fn clear_all(&mut self) -> Result<(), BatchError> {
        self.batch.clear_all()
    }

    pub fn completed_results(&self) -> Vec<&PaperAnalysis> {
        self.batch.completed_results()
    }

    /// Analyze every `Idle` or `Error` file, sequentially.
    ///
    /// `observer` sees each event right after it has been applied, together
    /// with the updated batch. It may remove entries; a later event for a
    /// removed file is dropped.
    pub async fn start_batch<F>(
        &mut self,
        cancel: CancellationToken,
        mut observer: F,
    ) -> Result<BatchSummary, BatchError>
    where
        F: FnMut(&BatchEvent, &mut Batch),
    {
        if self.batch.is_busy() {
            return Err(BatchError::Busy);
        }

        let jobs = self.batch.pending_jobs();
        tracing::info!(
            files = jobs.len(),
            provider = self.analyzer.name(),
            "starting batch"
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = run_batch(
            jobs,
            Arc::clone(&self.analyzer),
            self.options.reading_delay,
            tx,
            cancel,
        );

        let batch = &mut self.batch;
        let applier = async move {
            while let Some(event) = rx.recv().await {
                batch.apply(&event);
                observer(&event, &mut *batch);
            }
        };

        let (summary, ()) = tokio::join!(runner, applier);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileStatus;
    use crate::batch::PDF_MIME;
    use crate::fixtures::sample_analysis;
    use crate::providers::mock::MockAnalyzer;

    fn pdf(name: &str) -> SourceFile {
        SourceFile::new(name, PDF_MIME, b"%PDF-1.4".to_vec())
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            reading_delay: Duration::ZERO,
            ..PipelineOptions::default()
        }
    }

    #[tokio::test]
    async fn events_arrive_in_lifecycle_order() {
        let analyzer = Arc::new(MockAnalyzer::new(Ok(sample_analysis("A"))));
        let mut orch = Orchestrator::new(analyzer, options());
        let id = orch.add_files(vec![pdf("a.pdf")]).added[0];

        let mut seen = Vec::new();
        let summary = orch
            .start_batch(CancellationToken::new(), |event, batch| {
                let status = event.file_id().and_then(|id| batch.get(id)).map(|f| f.status);
                seen.push(status);
            })
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![
                Some(FileStatus::Reading),
                Some(FileStatus::Analyzing),
                Some(FileStatus::Completed),
                None,
            ]
        );
        assert_eq!(summary.completed, 1);
        assert_eq!(orch.batch().get(id).unwrap().status, FileStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn reading_delay_is_observable() {
        let analyzer = Arc::new(MockAnalyzer::new(Ok(sample_analysis("A"))));
        let mut orch = Orchestrator::new(analyzer, PipelineOptions::default());
        orch.add_files(vec![pdf("a.pdf")]);

        let start = tokio::time::Instant::now();
        let mut analyzing_at = None;
        orch.start_batch(CancellationToken::new(), |event, _| {
            if matches!(event, BatchEvent::Analyzing { .. }) {
                analyzing_at = Some(start.elapsed());
            }
        })
        .await
        .unwrap();

        assert!(analyzing_at.unwrap() >= crate::config::DEFAULT_READING_DELAY);
    }

    #[tokio::test]
    async fn prepare_failure_marks_file_error() {
        let analyzer = Arc::new(
            MockAnalyzer::new(Ok(sample_analysis("A")))
                .with_prepare_error(AnalysisError::Extraction("no extractable text".into())),
        );
        let mut orch = Orchestrator::new(analyzer.clone(), options());
        let id = orch.add_files(vec![pdf("scan.pdf")]).added[0];

        let summary = orch
            .start_batch(CancellationToken::new(), |_, _| {})
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(analyzer.call_count(), 0);
        let file = orch.batch().get(id).unwrap();
        assert_eq!(file.status, FileStatus::Error);
        assert!(file.error.as_deref().unwrap().contains("no extractable text"));
    }

    #[tokio::test]
    async fn cancelled_token_skips_every_file() {
        let analyzer = Arc::new(MockAnalyzer::new(Ok(sample_analysis("A"))));
        let mut orch = Orchestrator::new(analyzer.clone(), options());
        orch.add_files(vec![pdf("a.pdf"), pdf("b.pdf")]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = orch.start_batch(cancel, |_, _| {}).await.unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                completed: 0,
                failed: 0,
                cancelled: 2
            }
        );
        assert_eq!(analyzer.call_count(), 0);
        assert!(
            orch.batch()
                .files()
                .iter()
                .all(|f| f.status == FileStatus::Idle)
        );
    }

    #[tokio::test]
    async fn cancel_between_files_lets_current_finish() {
        let analyzer = Arc::new(
            MockAnalyzer::new(Ok(sample_analysis("A"))).with_delay(Duration::from_millis(20)),
        );
        let mut orch = Orchestrator::new(analyzer, options());
        let report = orch.add_files(vec![pdf("a.pdf"), pdf("b.pdf")]);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let summary = orch
            .start_batch(cancel, |event, _| {
                if matches!(event, BatchEvent::Analyzing { .. }) {
                    trigger.cancel();
                }
            })
            .await
            .unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.cancelled, 1);
        let batch = orch.batch();
        assert_eq!(batch.get(report.added[0]).unwrap().status, FileStatus::Completed);
        assert_eq!(batch.get(report.added[1]).unwrap().status, FileStatus::Idle);
    }

    #[tokio::test]
    async fn file_removed_mid_batch_drops_its_result() {
        let analyzer = Arc::new(
            MockAnalyzer::new(Ok(sample_analysis("Late"))).with_delay(Duration::from_millis(5)),
        );
        let mut orch = Orchestrator::new(analyzer, options());
        let report = orch.add_files(vec![pdf("gone.pdf"), pdf("kept.pdf")]);
        let (gone, kept) = (report.added[0], report.added[1]);

        let mut late_for_gone = 0;
        let summary = orch
            .start_batch(CancellationToken::new(), |event, batch| {
                match event {
                    BatchEvent::Analyzing { id } if *id == gone => {
                        assert!(batch.remove(gone));
                    }
                    BatchEvent::Completed { id, .. } if *id == gone => {
                        late_for_gone += 1;
                        assert!(batch.get(gone).is_none());
                    }
                    _ => {}
                }
            })
            .await
            .unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(late_for_gone, 1);
        assert_eq!(orch.batch().len(), 1);
        assert!(orch.batch().get(gone).is_none());
        assert_eq!(orch.batch().get(kept).unwrap().status, FileStatus::Completed);
        assert_eq!(orch.completed_results().len(), 1);
    }
}
