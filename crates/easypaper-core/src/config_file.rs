use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ProviderKind;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub provider: Option<ProviderConfig>,
    pub api_keys: Option<ApiKeysConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub export: Option<ExportConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: Option<ProviderKind>,
    pub endpoint_id: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub gemini: Option<String>,
    pub deepseek: Option<String>,
    pub qwen: Option<String>,
    pub doubao: Option<String>,
}

impl ApiKeysConfig {
    pub fn key_for(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Gemini => self.gemini.as_deref(),
            ProviderKind::DeepSeek => self.deepseek.as_deref(),
            ProviderKind::Qwen => self.qwen.as_deref(),
            ProviderKind::Doubao => self.doubao.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub reading_delay_ms: Option<u64>,
    pub response_language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_dir: Option<String>,
    /// Format extensions: "md", "pdf", "xlsx".
    pub formats: Option<Vec<String>>,
}

/// Platform config directory path: `<config_dir>/easypaper/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("easypaper").join("config.toml"))
}

/// Load config by cascading CWD `.easypaper.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".easypaper.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let provider = {
        let b = base.provider.unwrap_or_default();
        let o = overlay.provider.unwrap_or_default();
        ProviderConfig {
            kind: o.kind.or(b.kind),
            endpoint_id: o.endpoint_id.or(b.endpoint_id),
            base_url: o.base_url.or(b.base_url),
        }
    };
    let api_keys = {
        let b = base.api_keys.unwrap_or_default();
        let o = overlay.api_keys.unwrap_or_default();
        ApiKeysConfig {
            gemini: o.gemini.or(b.gemini),
            deepseek: o.deepseek.or(b.deepseek),
            qwen: o.qwen.or(b.qwen),
            doubao: o.doubao.or(b.doubao),
        }
    };
    let pipeline = {
        let b = base.pipeline.unwrap_or_default();
        let o = overlay.pipeline.unwrap_or_default();
        PipelineConfig {
            reading_delay_ms: o.reading_delay_ms.or(b.reading_delay_ms),
            response_language: o.response_language.or(b.response_language),
        }
    };
    let export = {
        let b = base.export.unwrap_or_default();
        let o = overlay.export.unwrap_or_default();
        ExportConfig {
            output_dir: o.output_dir.or(b.output_dir),
            formats: o.formats.or(b.formats),
        }
    };

    ConfigFile {
        provider: Some(provider),
        api_keys: Some(api_keys),
        pipeline: Some(pipeline),
        export: Some(export),
    }
}

/// Save the current config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    save_to_path(config, &path)?;
    Ok(path)
}

pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses_from_lowercase_toml() {
        let toml_str = "[provider]\nkind = \"deepseek\"\nendpoint_id = \"ep-1\"\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let provider = parsed.provider.unwrap();
        assert_eq!(provider.kind, Some(ProviderKind::DeepSeek));
        assert_eq!(provider.endpoint_id.as_deref(), Some("ep-1"));
    }

    #[test]
    fn absent_sections_deserialize_as_none() {
        let parsed: ConfigFile = toml::from_str("[pipeline]\nreading_delay_ms = 0\n").unwrap();
        assert!(parsed.api_keys.is_none());
        assert_eq!(parsed.pipeline.unwrap().reading_delay_ms, Some(0));
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            api_keys: Some(ApiKeysConfig {
                qwen: Some("base-key".into()),
                deepseek: Some("base-ds".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            api_keys: Some(ApiKeysConfig {
                qwen: Some("overlay-key".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        let keys = merged.api_keys.unwrap();
        assert_eq!(keys.key_for(ProviderKind::Qwen), Some("overlay-key"));
        assert_eq!(keys.key_for(ProviderKind::DeepSeek), Some("base-ds"));
        assert_eq!(keys.key_for(ProviderKind::Gemini), None);
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            export: Some(ExportConfig {
                output_dir: Some("/base/out".into()),
                formats: Some(vec!["md".into()]),
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        let export = merged.export.unwrap();
        assert_eq!(export.output_dir.as_deref(), Some("/base/out"));
        assert_eq!(export.formats, Some(vec!["md".to_string()]));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ConfigFile {
            provider: Some(ProviderConfig {
                kind: Some(ProviderKind::Doubao),
                endpoint_id: Some("ep-2024".into()),
                base_url: None,
            }),
            ..Default::default()
        };
        save_to_path(&config, &path).unwrap();
        let loaded = load_from_path(&path).unwrap();
        let provider = loaded.provider.unwrap();
        assert_eq!(provider.kind, Some(ProviderKind::Doubao));
        assert_eq!(provider.endpoint_id.as_deref(), Some("ep-2024"));
    }

    #[test]
    fn unparseable_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[provider\nkind = ").unwrap();
        assert!(load_from_path(&path).is_none());
    }
}
