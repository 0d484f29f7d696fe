//! Instruction prompts and the response schema shared by every provider.

use serde_json::{Value, json};

/// Section-by-section instructions. Numbering matches the exported reports.
const STRUCTURE: &str = "\
Follow this structure exactly:
- Basic Info: Title, Year, First Author, Journal/Conf, Vol/Issue, Keywords (English).
1. Research Question & Hypothesis: Core scientific problem and hypothesis.
2. Research Design: Overall thought process. (If Review: Main framework).
3. Methods & Tech: Data source, sample size, algorithms, platforms. (If Review: Details of review method).
4. Analysis Process: Steps, stats methods, validation.
5. Results: Key findings, quantitative indicators, qualitative conclusions.
6. Conclusion: Final conclusion based on evidence.
7. Evaluation: Contribution to field, rigor, logic.
8. Limitations & Inspiration: Doubts, limitations, new ideas.
9. Figures & Tables: List number, title, and summary.
10. References: Pick 1-2 most important references in format: Author, Year, Title, Journal, Vol, Page.";

const NOT_STATED: &str =
    "If the paper does not state a fact, write \"N/A\" instead of leaving the field empty.";

/// Textual JSON shape for providers without schema enforcement.
pub const JSON_SCHEMA_PROMPT: &str = r#"Respond with a valid JSON object strictly matching this schema:
{
  "basicInfo": {
    "title": "string",
    "year": "string",
    "firstAuthor": "string",
    "journal": "string",
    "volumeIssue": "string",
    "keywords": "string (English)"
  },
  "researchQuestion": "string (Research question and hypothesis)",
  "researchDesign": "string (Overall research design or Review framework)",
  "methods": "string (Methods, data, techniques)",
  "analysisProcess": "string (Step by step analysis)",
  "results": "string (Key findings)",
  "conclusion": "string (Final conclusion)",
  "evaluation": "string (Contribution, rigor, logic)",
  "limitations": "string (Limitations and inspirations)",
  "figuresTables": [
    { "number": "string", "title": "string", "content": "string" }
  ],
  "keyReferences": ["string"],
  "isReview": boolean
}"#;

pub const SYSTEM_PROMPT: &str = "You are a helpful academic assistant that outputs strict JSON.";

fn language_line(language: &str) -> String {
    format!(
        "Respond in {} for the content fields, but keep keywords in English.",
        language
    )
}

/// Prompt sent alongside the raw PDF to a native multimodal provider.
pub fn document_prompt(language: &str) -> String {
    format!(
        "Analyze the attached academic paper. You are an expert researcher.\n\
         Extract and summarize the information strictly based on the file content. DO NOT hallucinate.\n\n\
         {}\n{}\n\n{}",
        language_line(language),
        NOT_STATED,
        STRUCTURE
    )
}

/// Prompt embedding extracted text for a chat-completions provider.
pub fn text_prompt(language: &str, text: &str, truncated: bool) -> String {
    let mut prompt = format!(
        "Analyze the following academic paper text. You are an expert researcher.\n\
         Extract and summarize the information strictly based on the text provided.\n\n\
         {}\n{}\n\n{}\n\n{}\n\n\
         --- PAPER TEXT BEGINS ---\n{}\n--- PAPER TEXT ENDS ---",
        language_line(language),
        NOT_STATED,
        STRUCTURE,
        JSON_SCHEMA_PROMPT,
        text
    );
    if truncated {
        prompt.push_str("\n(Note: the text was truncated because it is too long.)");
    }
    prompt
}

fn string_field(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

/// Response schema enforced by the native multimodal provider.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "basicInfo": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "year": { "type": "STRING" },
                    "firstAuthor": { "type": "STRING" },
                    "journal": { "type": "STRING" },
                    "volumeIssue": { "type": "STRING" },
                    "keywords": string_field("English keywords comma separated"),
                },
                "required": ["title", "year", "firstAuthor", "journal", "volumeIssue", "keywords"],
            },
            "researchQuestion": string_field("Research question and hypothesis"),
            "researchDesign": string_field("Overall research design or Review framework"),
            "methods": string_field("Methods, data, techniques"),
            "analysisProcess": string_field("Step by step analysis or logic flow"),
            "results": string_field("Key findings, quantitative and qualitative"),
            "conclusion": string_field("Final conclusions based on evidence"),
            "evaluation": string_field("Contribution, rigor, logic evaluation"),
            "limitations": string_field("Limitations and future inspirations"),
            "figuresTables": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "number": string_field("e.g., Fig 1"),
                        "title": { "type": "STRING" },
                        "content": string_field("Core content summary"),
                    },
                    "required": ["number", "title", "content"],
                },
            },
            "keyReferences": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "1-2 most representative references (Author, Year, Title, Journal...)",
            },
            "isReview": {
                "type": "BOOLEAN",
                "description": "True if the paper is a review/survey article",
            },
        },
        "required": [
            "basicInfo", "researchQuestion", "researchDesign", "methods",
            "analysisProcess", "results", "conclusion", "evaluation",
            "limitations", "figuresTables", "keyReferences", "isReview",
        ],
    })
}
