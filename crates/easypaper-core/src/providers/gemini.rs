//! Native multimodal adapter: the raw PDF goes to the model together with a
//! response schema the provider enforces.

use std::future::Future;
use std::pin::Pin;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use super::{
    DocumentPayload, PaperAnalyzer, failure_from_response, parse_analysis, prompt, success_body,
};
use crate::{AnalysisError, PaperAnalysis};

pub const PDF_MIME: &str = "application/pdf";

pub struct GeminiAdapter {
    name: &'static str,
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    language: String,
}

impl GeminiAdapter {
    pub fn new(
        name: &'static str,
        client: reqwest::Client,
        base_url: String,
        model: String,
        api_key: String,
        language: String,
    ) -> Self {
        Self {
            name,
            client,
            base_url,
            model,
            api_key,
            language,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub fn request_body(&self, bytes: &[u8], mime_type: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": mime_type, "data": STANDARD.encode(bytes) } },
                    { "text": prompt::document_prompt(&self.language) },
                ],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": prompt::response_schema(),
                "temperature": 0.2,
            },
        })
    }

    async fn analyze_document(
        &self,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<PaperAnalysis, AnalysisError> {
        tracing::debug!(
            provider = self.name,
            model = %self.model,
            payload = "pdf",
            bytes = bytes.len(),
            "sending analysis request"
        );

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(bytes, mime_type))
            .send()
            .await
            .map_err(|e| AnalysisError::provider(None, e.to_string()))?;

        handle_response(resp).await
    }
}

impl PaperAnalyzer for GeminiAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn prepare(&self, pdf: &[u8]) -> Result<DocumentPayload, AnalysisError> {
        Ok(DocumentPayload::Pdf {
            bytes: pdf.to_vec(),
            mime_type: PDF_MIME.to_string(),
        })
    }

    fn analyze<'a>(
        &'a self,
        payload: &'a DocumentPayload,
    ) -> Pin<Box<dyn Future<Output = Result<PaperAnalysis, AnalysisError>> + Send + 'a>> {
        Box::pin(async move {
            match payload {
                DocumentPayload::Pdf { bytes, mime_type } => {
                    self.analyze_document(bytes, mime_type).await
                }
                DocumentPayload::Text(_) => Err(AnalysisError::Configuration(format!(
                    "{} expects the PDF bytes, not extracted text",
                    self.name
                ))),
            }
        })
    }
}

/// Turn a `generateContent` response into a validated analysis.
pub async fn handle_response(resp: reqwest::Response) -> Result<PaperAnalysis, AnalysisError> {
    if !resp.status().is_success() {
        return Err(failure_from_response(resp).await);
    }

    let data = success_body(resp).await?;

    let text = answer_text(&data);
    if text.trim().is_empty() {
        let message = match data["promptFeedback"]["blockReason"].as_str() {
            Some(reason) => format!("no text payload in response (blocked: {})", reason),
            None => "no text payload in response".to_string(),
        };
        return Err(AnalysisError::provider(None, message));
    }

    parse_analysis(&text)
}

/// Concatenated text of every part of the first candidate.
fn answer_text(data: &Value) -> String {
    data["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default()
}
