//! Provider adapters that turn a PDF into a validated [`PaperAnalysis`].

pub mod gemini;
pub mod mock;
pub mod openai_compat;
pub mod prompt;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::config::{PipelineOptions, ProviderFamily, ProviderSettings};
use crate::{AnalysisError, PaperAnalysis, PdfBackend};

pub use gemini::GeminiAdapter;
pub use openai_compat::ChatAdapter;

/// What a provider is fed: the raw document, or its extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentPayload {
    Pdf { bytes: Vec<u8>, mime_type: String },
    Text(String),
}

impl DocumentPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pdf { .. } => "pdf",
            Self::Text(_) => "text",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Pdf { bytes, .. } => bytes.len(),
            Self::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A provider able to analyze one paper.
///
/// Analysis is split in two: [`prepare`](PaperAnalyzer::prepare) is
/// synchronous and may be CPU-bound (local text extraction), so the
/// pipeline runs it on a blocking thread; [`analyze`](PaperAnalyzer::analyze)
/// performs exactly one outbound request and never retries.
pub trait PaperAnalyzer: Send + Sync {
    /// Display name, e.g. "DeepSeek-V3".
    fn name(&self) -> &str;

    /// Turn raw PDF bytes into the payload this provider accepts.
    fn prepare(&self, pdf: &[u8]) -> Result<DocumentPayload, AnalysisError>;

    fn analyze<'a>(
        &'a self,
        payload: &'a DocumentPayload,
    ) -> Pin<Box<dyn Future<Output = Result<PaperAnalysis, AnalysisError>> + Send + 'a>>;
}

/// Closed set of concrete adapters, selected by [`ProviderFamily`].
pub enum ProviderAdapter {
    NativeMultimodal(GeminiAdapter),
    OpenAiCompatible(ChatAdapter),
}

impl ProviderAdapter {
    /// Build the adapter for `settings.kind`.
    ///
    /// Fails with [`AnalysisError::Configuration`] when the API key is
    /// missing, or when the provider needs an endpoint id and none is set.
    /// No request is made in either case.
    pub fn new(
        settings: &ProviderSettings,
        options: &PipelineOptions,
        backend: Arc<dyn PdfBackend>,
    ) -> Result<Self, AnalysisError> {
        let config = settings.kind.model_config();

        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AnalysisError::Configuration(format!(
                    "{} API key is required (set {} or pass --api-key)",
                    config.display_name, config.api_key_env
                ))
            })?;

        let model = settings.effective_model();
        if model.trim().is_empty() {
            return Err(AnalysisError::Configuration(format!(
                "{} requires an endpoint id (model id)",
                config.display_name
            )));
        }

        // No request timeout beyond the transport defaults.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("HTTP client: {}", e)))?;

        let base_url = settings.effective_base_url();
        let language = options.response_language.clone();

        Ok(match config.family {
            ProviderFamily::NativeMultimodal => Self::NativeMultimodal(GeminiAdapter::new(
                config.display_name,
                client,
                base_url,
                model.to_string(),
                api_key.to_string(),
                language,
            )),
            ProviderFamily::OpenAiCompatible => Self::OpenAiCompatible(ChatAdapter::new(
                config.display_name,
                client,
                base_url,
                model.to_string(),
                api_key.to_string(),
                language,
                backend,
            )),
        })
    }
}

impl PaperAnalyzer for ProviderAdapter {
    fn name(&self) -> &str {
        match self {
            Self::NativeMultimodal(a) => a.name(),
            Self::OpenAiCompatible(a) => a.name(),
        }
    }

    fn prepare(&self, pdf: &[u8]) -> Result<DocumentPayload, AnalysisError> {
        match self {
            Self::NativeMultimodal(a) => a.prepare(pdf),
            Self::OpenAiCompatible(a) => a.prepare(pdf),
        }
    }

    fn analyze<'a>(
        &'a self,
        payload: &'a DocumentPayload,
    ) -> Pin<Box<dyn Future<Output = Result<PaperAnalysis, AnalysisError>> + Send + 'a>> {
        match self {
            Self::NativeMultimodal(a) => a.analyze(payload),
            Self::OpenAiCompatible(a) => a.analyze(payload),
        }
    }
}

/// Build a `Provider` error from a non-success response.
///
/// The message is `error.message` from a JSON body when present, else the
/// status's canonical reason.
pub(crate) async fn failure_from_response(resp: reqwest::Response) -> AnalysisError {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    let message = body["error"]["message"]
        .as_str()
        .filter(|m| !m.trim().is_empty())
        .map(String::from)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown status").to_string());
    tracing::warn!(status = status.as_u16(), %message, "provider returned non-success status");
    AnalysisError::provider(Some(status.as_u16()), message)
}

/// Read a success body as JSON.
///
/// An empty body is a `Provider` error; a body that is not JSON is a `Parse`
/// error.
pub(crate) async fn success_body(resp: reqwest::Response) -> Result<Value, AnalysisError> {
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .map_err(|e| AnalysisError::provider(None, format!("failed to read response body: {}", e)))?;
    if body.trim().is_empty() {
        return Err(AnalysisError::provider(Some(status), "empty response body"));
    }
    serde_json::from_str(&body)
        .map_err(|e| AnalysisError::Parse(format!("response body is not JSON: {}", e)))
}

/// Deserialize and validate one analysis document.
pub(crate) fn parse_analysis(json: &str) -> Result<PaperAnalysis, AnalysisError> {
    let analysis: PaperAnalysis = serde_json::from_str(json)
        .map_err(|e| AnalysisError::Parse(format!("response is not a valid analysis: {}", e)))?;
    analysis.validate().map_err(AnalysisError::Parse)?;
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::extract::tests::StubBackend;

    fn backend() -> Arc<dyn PdfBackend> {
        Arc::new(StubBackend::pages(&["text"]))
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let settings = ProviderSettings::new(ProviderKind::DeepSeek);
        let err = ProviderAdapter::new(&settings, &PipelineOptions::default(), backend())
            .err()
            .unwrap();
        match err {
            AnalysisError::Configuration(msg) => assert!(msg.contains("DEEPSEEK_API_KEY")),
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn blank_key_is_configuration_error() {
        let settings = ProviderSettings::new(ProviderKind::Gemini).with_api_key("   ");
        assert!(matches!(
            ProviderAdapter::new(&settings, &PipelineOptions::default(), backend()),
            Err(AnalysisError::Configuration(_))
        ));
    }

    #[test]
    fn doubao_without_endpoint_is_configuration_error() {
        let settings = ProviderSettings::new(ProviderKind::Doubao).with_api_key("ark-key");
        let err = ProviderAdapter::new(&settings, &PipelineOptions::default(), backend())
            .err()
            .unwrap();
        match err {
            AnalysisError::Configuration(msg) => assert!(msg.contains("endpoint id")),
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn family_selects_adapter() {
        let options = PipelineOptions::default();
        let gemini = ProviderSettings::new(ProviderKind::Gemini).with_api_key("k");
        let adapter = ProviderAdapter::new(&gemini, &options, backend()).unwrap();
        assert!(matches!(adapter, ProviderAdapter::NativeMultimodal(_)));
        assert_eq!(adapter.name(), "Gemini 2.5 Flash");

        let doubao = ProviderSettings::new(ProviderKind::Doubao)
            .with_api_key("k")
            .with_endpoint_id("ep-20240101");
        let adapter = ProviderAdapter::new(&doubao, &options, backend()).unwrap();
        assert!(matches!(adapter, ProviderAdapter::OpenAiCompatible(_)));
        assert_eq!(adapter.name(), "Doubao-Pro");
    }

    #[test]
    fn parse_analysis_rejects_empty_field() {
        let mut value: Value =
            serde_json::from_str(&crate::fixtures::sample_json("A Paper")).unwrap();
        value["methods"] = Value::String(String::new());
        let err = parse_analysis(&value.to_string()).unwrap_err();
        match err {
            AnalysisError::Parse(msg) => assert!(msg.contains("methods")),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_falls_back_to_canonical_reason() {
        let http_resp = http::Response::builder()
            .status(502)
            .body("<html>bad gateway</html>")
            .unwrap();
        let err = failure_from_response(reqwest::Response::from(http_resp)).await;
        assert_eq!(err, AnalysisError::provider(Some(502), "Bad Gateway"));
    }
}
