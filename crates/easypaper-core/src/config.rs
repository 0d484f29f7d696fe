use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Wire family a provider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// Accepts the raw PDF bytes and enforces a response schema.
    NativeMultimodal,
    /// `/chat/completions` endpoint fed with locally extracted text.
    OpenAiCompatible,
}

/// Static per-provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub display_name: &'static str,
    pub family: ProviderFamily,
    pub base_url: &'static str,
    /// Empty when the user must supply an endpoint id.
    pub default_model: &'static str,
    pub needs_endpoint: bool,
    /// Environment variable the API key is read from.
    pub api_key_env: &'static str,
}

const GEMINI: ModelConfig = ModelConfig {
    display_name: "Gemini 2.5 Flash",
    family: ProviderFamily::NativeMultimodal,
    base_url: "https://generativelanguage.googleapis.com/v1beta",
    default_model: "gemini-2.5-flash",
    needs_endpoint: false,
    api_key_env: "GEMINI_API_KEY",
};

const DEEPSEEK: ModelConfig = ModelConfig {
    display_name: "DeepSeek-V3",
    family: ProviderFamily::OpenAiCompatible,
    base_url: "https://api.deepseek.com",
    default_model: "deepseek-chat",
    needs_endpoint: false,
    api_key_env: "DEEPSEEK_API_KEY",
};

const QWEN: ModelConfig = ModelConfig {
    display_name: "Qwen-Plus",
    family: ProviderFamily::OpenAiCompatible,
    base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1",
    default_model: "qwen-plus",
    needs_endpoint: false,
    api_key_env: "DASHSCOPE_API_KEY",
};

const DOUBAO: ModelConfig = ModelConfig {
    display_name: "Doubao-Pro",
    family: ProviderFamily::OpenAiCompatible,
    base_url: "https://ark.cn-beijing.volces.com/api/v3",
    default_model: "",
    needs_endpoint: true,
    api_key_env: "ARK_API_KEY",
};

/// Closed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    DeepSeek,
    Qwen,
    Doubao,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Gemini,
        ProviderKind::DeepSeek,
        ProviderKind::Qwen,
        ProviderKind::Doubao,
    ];

    pub fn model_config(self) -> &'static ModelConfig {
        match self {
            Self::Gemini => &GEMINI,
            Self::DeepSeek => &DEEPSEEK,
            Self::Qwen => &QWEN,
            Self::Doubao => &DOUBAO,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::DeepSeek => "deepseek",
            Self::Qwen => "qwen",
            Self::Doubao => "doubao",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|k| k.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown provider '{}' (expected one of: gemini, deepseek, qwen, doubao)",
                    s
                )
            })
    }
}

/// Caller-supplied settings for one provider adapter.
#[derive(Clone, Default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    /// Overrides the default model id; required for Doubao.
    pub custom_endpoint_id: Option<String>,
    /// Overrides the table's base URL (proxies, gateways, tests).
    pub base_url: Option<String>,
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_endpoint_id(mut self, id: impl Into<String>) -> Self {
        self.custom_endpoint_id = Some(id.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Base URL without a trailing slash.
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(self.kind.model_config().base_url)
            .trim_end_matches('/')
            .to_string()
    }

    /// Model identifier: the endpoint override if set, else the default.
    pub fn effective_model(&self) -> &str {
        self.custom_endpoint_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(self.kind.model_config().default_model)
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("custom_endpoint_id", &self.custom_endpoint_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

pub const DEFAULT_READING_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_RESPONSE_LANGUAGE: &str = "Chinese (Simplified)";

/// Options for the batch pipeline and the instruction prompt.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// How long a file stays in READING before analysis starts.
    /// `Duration::ZERO` skips the wait.
    pub reading_delay: Duration,
    /// Language requested for the narrative fields.
    pub response_language: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            reading_delay: DEFAULT_READING_DELAY,
            response_language: DEFAULT_RESPONSE_LANGUAGE.to_string(),
        }
    }
}
