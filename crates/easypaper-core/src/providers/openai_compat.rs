//! Chat-completions adapter for OpenAI-compatible providers (DeepSeek, Qwen,
//! Doubao). Text is extracted locally and embedded in the prompt.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Value, json};

use super::{
    DocumentPayload, PaperAnalyzer, failure_from_response, parse_analysis, prompt, success_body,
};
use crate::{AnalysisError, PaperAnalysis, PdfBackend, extract_text};

/// Character budget for the paper text embedded in one prompt.
pub const MAX_TEXT_CHARS: usize = 100_000;

pub struct ChatAdapter {
    name: &'static str,
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    language: String,
    backend: Arc<dyn PdfBackend>,
}

impl ChatAdapter {
    pub fn new(
        name: &'static str,
        client: reqwest::Client,
        base_url: String,
        model: String,
        api_key: String,
        language: String,
        backend: Arc<dyn PdfBackend>,
    ) -> Self {
        Self {
            name,
            client,
            base_url,
            model,
            api_key,
            language,
            backend,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn request_body(&self, text: &str) -> Value {
        let (text, truncated) = truncate_chars(text, MAX_TEXT_CHARS);
        if truncated {
            tracing::debug!(
                provider = self.name,
                limit = MAX_TEXT_CHARS,
                "paper text truncated"
            );
        }

        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt::SYSTEM_PROMPT },
                { "role": "user", "content": prompt::text_prompt(&self.language, text, truncated) },
            ],
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
        })
    }

    async fn analyze_text(&self, text: &str) -> Result<PaperAnalysis, AnalysisError> {
        tracing::debug!(
            provider = self.name,
            model = %self.model,
            payload = "text",
            chars = text.len(),
            "sending analysis request"
        );

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| AnalysisError::provider(None, e.to_string()))?;

        handle_response(resp).await
    }
}

impl PaperAnalyzer for ChatAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn prepare(&self, pdf: &[u8]) -> Result<DocumentPayload, AnalysisError> {
        extract_text(self.backend.as_ref(), pdf).map(DocumentPayload::Text)
    }

    fn analyze<'a>(
        &'a self,
        payload: &'a DocumentPayload,
    ) -> Pin<Box<dyn Future<Output = Result<PaperAnalysis, AnalysisError>> + Send + 'a>> {
        Box::pin(async move {
            match payload {
                DocumentPayload::Text(text) => self.analyze_text(text).await,
                DocumentPayload::Pdf { .. } => Err(AnalysisError::Configuration(format!(
                    "{} expects extracted text, not PDF bytes",
                    self.name
                ))),
            }
        })
    }
}

/// Turn a chat-completions response into a validated analysis.
pub async fn handle_response(resp: reqwest::Response) -> Result<PaperAnalysis, AnalysisError> {
    if !resp.status().is_success() {
        return Err(failure_from_response(resp).await);
    }

    let data = success_body(resp).await?;

    let content = data["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("");
    if content.is_empty() {
        return Err(AnalysisError::provider(
            None,
            "empty response from AI provider",
        ));
    }

    let json = extract_json_object(content)
        .ok_or_else(|| AnalysisError::Parse("no JSON object found in response".into()))?;
    if json.len() != content.trim().len() {
        tracing::debug!(
            dropped = content.len() - json.len(),
            "trimmed text around JSON object"
        );
    }
    parse_analysis(json)
}

/// Slice from the first `{` to the last `}`, inclusive.
pub fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

/// Keep at most `max` characters from the head of `text`.
pub fn truncate_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
