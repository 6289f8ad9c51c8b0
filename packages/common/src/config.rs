use crate::backoff::BackoffConfig;
use crate::origin::CODE_EDITOR;
use crate::result::CommonResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "enso-sync.config.json";

/// Sync core configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Retry policy for language-server requests
    pub backoff: BackoffConfig,

    /// Identifier standing for a hole in code templates
    pub placeholder: PlaceholderConfig,

    pub code_editor: CodeEditorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderConfig(pub String);

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self("__".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeEditorConfig {
    /// Component name used in the `local:userAction:<name>` origin tag
    pub origin_component: String,
}

impl Default for CodeEditorConfig {
    fn default() -> Self {
        Self {
            origin_component: CODE_EDITOR.to_string(),
        }
    }
}

impl Config {
    /// Load config from a directory
    pub fn load(dir: impl AsRef<Path>) -> CommonResult<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommonError;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "backoff": { "maxRetries": 5, "retryDelayMs": 10 },
            "placeholder": "__x",
            "codeEditor": { "originComponent": "MarkdownEditor" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.backoff.max_retries, 5);
        assert_eq!(config.backoff.retry_delay_ms, 10);
        assert_eq!(config.backoff.retry_delay_max_ms, 10_000);
        assert_eq!(config.placeholder(), "__x");
        assert_eq!(config.code_editor.origin_component, "MarkdownEditor");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.placeholder(), "__");
        assert_eq!(config.code_editor.origin_component, "CodeEditor");
        assert_eq!(config.backoff.max_retries, 3);
    }

    #[test]
    fn test_load_missing_and_present() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "placeholder": "$$" }"#).unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.placeholder(), "$$");
        assert_eq!(config.code_editor, CodeEditorConfig::default());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(CommonError::Config(_))));
    }
}
