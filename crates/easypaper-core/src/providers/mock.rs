//! Mock analyzer for testing the pipeline without network access.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{DocumentPayload, PaperAnalyzer};
use crate::{AnalysisError, PaperAnalysis};

/// A hand-rolled mock implementing [`PaperAnalyzer`] for tests.
///
/// Supports:
/// - A sequence of outcomes (one per call, repeating the last if exhausted).
/// - Optional per-call latency.
/// - Call counting and a high-water mark of concurrent calls, so tests can
///   assert that the pipeline never overlaps two analyses.
pub struct MockAnalyzer {
    name: &'static str,
    /// Reversed so `pop()` yields the next outcome.
    responses: Mutex<Vec<Result<PaperAnalysis, AnalysisError>>>,
    fallback: Result<PaperAnalysis, AnalysisError>,
    prepare_error: Option<AnalysisError>,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockAnalyzer {
    /// Create a mock that always returns `outcome`.
    pub fn new(outcome: Result<PaperAnalysis, AnalysisError>) -> Self {
        Self::with_sequence(vec![outcome])
    }

    /// Create a mock that returns outcomes in order, repeating the last one.
    ///
    /// # Panics
    /// If `responses` is empty.
    pub fn with_sequence(mut responses: Vec<Result<PaperAnalysis, AnalysisError>>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        responses.reverse();
        let fallback = responses[0].clone();
        Self {
            name: "Mock",
            responses: Mutex::new(responses),
            fallback,
            prepare_error: None,
            delay: None,
            call_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Set simulated provider latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every `prepare()` fail, as for an unreadable PDF.
    pub fn with_prepare_error(mut self, err: AnalysisError) -> Self {
        self.prepare_error = Some(err);
        self
    }

    /// How many times `analyze()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of `analyze()` calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<PaperAnalysis, AnalysisError> {
        let mut seq = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        seq.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

impl PaperAnalyzer for MockAnalyzer {
    fn name(&self) -> &str {
        self.name
    }

    fn prepare(&self, pdf: &[u8]) -> Result<DocumentPayload, AnalysisError> {
        if let Some(err) = &self.prepare_error {
            return Err(err.clone());
        }
        Ok(DocumentPayload::Pdf {
            bytes: pdf.to_vec(),
            mime_type: "application/pdf".into(),
        })
    }

    fn analyze<'a>(
        &'a self,
        _payload: &'a DocumentPayload,
    ) -> Pin<Box<dyn Future<Output = Result<PaperAnalysis, AnalysisError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response();
        let delay = self.delay;

        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            response
        })
    }
}
