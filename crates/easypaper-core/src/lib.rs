use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod backend;
pub mod batch;
pub mod config;
pub mod config_file;
pub mod extract;
pub mod pipeline;
pub mod providers;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend};
pub use batch::{
    AnalyzedFile, Batch, BatchError, FileId, FileJob, FileStatus, IntakeReport, SourceFile,
};
pub use config::{ModelConfig, PipelineOptions, ProviderFamily, ProviderKind, ProviderSettings};
pub use extract::extract_text;
pub use pipeline::{BatchEvent, BatchSummary, Orchestrator, run_batch};
pub use providers::{DocumentPayload, PaperAnalyzer, ProviderAdapter};

/// Bibliographic header of an analyzed paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    pub title: String,
    #[serde(deserialize_with = "string_or_number")]
    pub year: String,
    pub first_author: String,
    pub journal: String,
    pub volume_issue: String,
    /// English keywords, comma separated.
    pub keywords: String,
}

/// Summary of one figure or table, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureTableSummary {
    /// Label as printed in the paper, e.g. "Fig 1" or "Table 2".
    pub number: String,
    pub title: String,
    pub content: String,
}

/// Structured summary of a paper, as returned by a provider.
///
/// The JSON shape (camelCase keys) is the contract shared with every
/// provider prompt and with the native response schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperAnalysis {
    pub basic_info: BasicInfo,
    pub research_question: String,
    /// Overall design, or the review framework when `is_review` is set.
    pub research_design: String,
    pub methods: String,
    pub analysis_process: String,
    pub results: String,
    pub conclusion: String,
    pub evaluation: String,
    pub limitations: String,
    pub figures_tables: Vec<FigureTableSummary>,
    /// One or two representative citations.
    pub key_references: Vec<String>,
    pub is_review: bool,
}

impl PaperAnalysis {
    /// Check that every string field carries content.
    ///
    /// Providers are asked to write "N/A" for facts the paper does not state,
    /// so an empty field means the response broke the contract.
    pub fn validate(&self) -> Result<(), String> {
        let info = &self.basic_info;
        let fields = [
            ("basicInfo.title", info.title.as_str()),
            ("basicInfo.year", info.year.as_str()),
            ("basicInfo.firstAuthor", info.first_author.as_str()),
            ("basicInfo.journal", info.journal.as_str()),
            ("basicInfo.volumeIssue", info.volume_issue.as_str()),
            ("basicInfo.keywords", info.keywords.as_str()),
            ("researchQuestion", self.research_question.as_str()),
            ("researchDesign", self.research_design.as_str()),
            ("methods", self.methods.as_str()),
            ("analysisProcess", self.analysis_process.as_str()),
            ("results", self.results.as_str()),
            ("conclusion", self.conclusion.as_str()),
            ("evaluation", self.evaluation.as_str()),
            ("limitations", self.limitations.as_str()),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(format!("field `{}` is empty", name));
        }

        for (i, figure) in self.figures_tables.iter().enumerate() {
            if figure.number.trim().is_empty()
                || figure.title.trim().is_empty()
                || figure.content.trim().is_empty()
            {
                return Err(format!("figuresTables[{}] has an empty entry", i));
            }
        }
        if let Some(i) = self.key_references.iter().position(|r| r.trim().is_empty()) {
            return Err(format!("keyReferences[{}] is empty", i));
        }
        Ok(())
    }
}

/// Models occasionally emit the year as a bare number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Year::deserialize(deserializer)? {
        Year::Text(s) => s,
        Year::Number(n) => n.to_string(),
    })
}

/// Failure taxonomy for analyzing a single paper.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Missing or invalid credential / endpoint id. No request was made.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The PDF could not be parsed or contains no extractable text.
    #[error("extraction error: {0}")]
    Extraction(String),
    /// The provider answered with a failure status or an empty payload,
    /// or the request never reached it (`status` is `None`).
    #[error("provider error: {}", provider_message(.status, .message))]
    Provider {
        status: Option<u16>,
        message: String,
    },
    /// The answer was not JSON matching the `PaperAnalysis` schema.
    #[error("parse error: {0}")]
    Parse(String),
}

impl AnalysisError {
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }
}

fn provider_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("API error {} - {}", code, message),
        None => message.to_string(),
    }
}

impl From<BackendError> for AnalysisError {
    fn from(e: BackendError) -> Self {
        AnalysisError::Extraction(e.to_string())
    }
}
