use std::path::PathBuf;
use std::time::Duration;

use easypaper_core::config::{DEFAULT_READING_DELAY, DEFAULT_RESPONSE_LANGUAGE};
use easypaper_core::config_file::{
    ApiKeysConfig, ConfigFile, ExportConfig, PipelineConfig, ProviderConfig,
};
use easypaper_core::{PipelineOptions, ProviderKind, ProviderSettings};
use easypaper_reporting::ExportFormat;

pub const PROVIDER_ENV: &str = "EASYPAPER_PROVIDER";
pub const ENDPOINT_ID_ENV: &str = "EASYPAPER_ENDPOINT_ID";

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default)]
pub struct Flags {
    pub provider: Option<ProviderKind>,
    pub api_key: Option<String>,
    pub endpoint_id: Option<String>,
    pub base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub formats: Vec<ExportFormat>,
    pub no_delay: bool,
}

/// Everything `analyze` needs, fully resolved.
#[derive(Debug)]
pub struct Resolved {
    pub provider: ProviderSettings,
    pub pipeline: PipelineOptions,
    pub output_dir: PathBuf,
    pub formats: Vec<ExportFormat>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
///
/// `env` looks up one environment variable; `std::env::var` in the binary.
pub fn resolve(
    flags: Flags,
    file: ConfigFile,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Resolved> {
    let file_provider = file.provider.unwrap_or_default();

    let kind = match flags.provider {
        Some(kind) => kind,
        None => match non_blank(env(PROVIDER_ENV)) {
            Some(raw) => raw
                .parse::<ProviderKind>()
                .map_err(|e| anyhow::anyhow!("{}: {}", PROVIDER_ENV, e))?,
            None => file_provider.kind.unwrap_or_default(),
        },
    };

    // Endpoint and base URL in the file belong to the provider named there.
    let file_matches = file_provider.kind.is_none_or(|k| k == kind);

    let api_key = non_blank(flags.api_key)
        .or_else(|| non_blank(env(kind.model_config().api_key_env)))
        .or_else(|| {
            non_blank(
                file.api_keys
                    .as_ref()
                    .and_then(|keys| keys.key_for(kind))
                    .map(str::to_string),
            )
        });
    let endpoint_id = non_blank(flags.endpoint_id)
        .or_else(|| non_blank(env(ENDPOINT_ID_ENV)))
        .or_else(|| {
            file_matches
                .then_some(file_provider.endpoint_id.clone())
                .flatten()
        });
    let base_url = non_blank(flags.base_url).or_else(|| {
        file_matches
            .then_some(file_provider.base_url.clone())
            .flatten()
    });

    let mut provider = ProviderSettings::new(kind);
    provider.api_key = api_key;
    provider.custom_endpoint_id = non_blank(endpoint_id);
    provider.base_url = non_blank(base_url);

    let file_pipeline = file.pipeline.unwrap_or_default();
    let reading_delay = if flags.no_delay {
        Duration::ZERO
    } else {
        file_pipeline
            .reading_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_READING_DELAY)
    };
    let pipeline = PipelineOptions {
        reading_delay,
        response_language: non_blank(file_pipeline.response_language)
            .unwrap_or_else(|| DEFAULT_RESPONSE_LANGUAGE.to_string()),
    };

    let file_export = file.export.unwrap_or_default();
    let output_dir = flags
        .output_dir
        .or_else(|| non_blank(file_export.output_dir).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    let formats = if !flags.formats.is_empty() {
        flags.formats
    } else {
        let from_file: Vec<ExportFormat> = file_export
            .formats
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| match raw.parse() {
                Ok(format) => Some(format),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring export format from config file");
                    None
                }
            })
            .collect();
        if from_file.is_empty() {
            vec![ExportFormat::Markdown]
        } else {
            from_file
        }
    };

    tracing::debug!(provider = ?provider, ?reading_delay, "configuration resolved");

    Ok(Resolved {
        provider,
        pipeline,
        output_dir,
        formats: dedup(formats),
    })
}

/// Values to persist with `easypaper config save`.
#[derive(Debug, Default)]
pub struct SaveFlags {
    pub provider: Option<ProviderKind>,
    pub api_key: Option<String>,
    pub endpoint_id: Option<String>,
    pub base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub formats: Vec<ExportFormat>,
    pub reading_delay_ms: Option<u64>,
    pub response_language: Option<String>,
}

/// Build a config holding only the given values, ready to be merged over the
/// saved one.
pub fn config_overlay(flags: SaveFlags) -> anyhow::Result<ConfigFile> {
    let api_keys = match non_blank(flags.api_key) {
        None => None,
        Some(key) => {
            let Some(kind) = flags.provider else {
                anyhow::bail!("--api-key needs --provider to know which key to store");
            };
            let mut keys = ApiKeysConfig::default();
            let slot = match kind {
                ProviderKind::Gemini => &mut keys.gemini,
                ProviderKind::DeepSeek => &mut keys.deepseek,
                ProviderKind::Qwen => &mut keys.qwen,
                ProviderKind::Doubao => &mut keys.doubao,
            };
            *slot = Some(key);
            Some(keys)
        }
    };

    let formats = dedup(flags.formats);
    Ok(ConfigFile {
        provider: Some(ProviderConfig {
            kind: flags.provider,
            endpoint_id: non_blank(flags.endpoint_id),
            base_url: non_blank(flags.base_url),
        }),
        api_keys,
        pipeline: Some(PipelineConfig {
            reading_delay_ms: flags.reading_delay_ms,
            response_language: non_blank(flags.response_language),
        }),
        export: Some(ExportConfig {
            output_dir: flags.output_dir.map(|d| d.display().to_string()),
            formats: (!formats.is_empty())
                .then(|| formats.iter().map(|f| f.extension().to_string()).collect()),
        }),
    })
}

fn dedup(formats: Vec<ExportFormat>) -> Vec<ExportFormat> {
    let mut out = Vec::with_capacity(formats.len());
    for format in formats {
        if !out.contains(&format) {
            out.push(format);
        }
    }
    out
}
