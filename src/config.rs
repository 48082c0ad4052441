//! Run settings.
//!
//! Settings come from an optional YAML file next to the invocation. When the
//! default file is absent every field falls back to the values below, the
//! same way a missing model registry falls back to its default model.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SETTINGS_FILE: &str = "tdforge.yml";
pub const CREDENTIAL_ENV_VAR: &str = "TOGETHER_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no API credential: pass --api-key or set TOGETHER_API_KEY")]
    MissingCredential,
}

/// Model endpoint, token budgets and local tool locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub api_base: String,
    pub model: String,
    /// Model used for the free-form thought pass. Falls back to the answer model.
    pub thought_model: Option<String>,
    pub thought_max_tokens: u32,
    pub thought_stop: Vec<String>,
    pub test_max_tokens: u32,
    pub implementation_max_tokens: u32,
    pub test_generation_thought: bool,
    pub implementation_thought: bool,
    /// Extension (without the dot) of the files fed to the model.
    pub source_extension: String,
    /// Interpreter used as `<python> -m pytest`.
    pub python: String,
    /// Client-side request timeout. Unset means wait as long as the provider takes.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: "https://api.together.xyz/v1".to_string(),
            model: "Qwen/Qwen2.5-Coder-32B-Instruct".to_string(),
            thought_model: None,
            thought_max_tokens: 25000,
            thought_stop: vec!["</think>".to_string()],
            test_max_tokens: 22000,
            implementation_max_tokens: 20000,
            test_generation_thought: true,
            implementation_thought: false,
            source_extension: "py".to_string(),
            python: "python3".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Loads settings.
    ///
    /// With `None` the default file is tried and silently skipped when
    /// missing. An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::from_file(path)
            }
            None => {
                let path = Path::new(DEFAULT_SETTINGS_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Thought-pass model, or `answer_model` when none is configured.
    pub fn thought_model_or<'a>(&'a self, answer_model: &'a str) -> &'a str {
        self.thought_model.as_deref().unwrap_or(answer_model)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Picks the API credential: explicit value first, then the environment.
pub fn resolve_credential(explicit: Option<String>) -> Result<String, ConfigError> {
    explicit
        .filter(|key| !key.trim().is_empty())
        .or_else(|| std::env::var(CREDENTIAL_ENV_VAR).ok())
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigError::MissingCredential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_settings_keeps_defaults() {
        let yaml = r#"
model: deepseek-ai/DeepSeek-V3
implementation_thought: true
request_timeout_secs: 600
"#;
        let settings = Settings::parse(yaml).unwrap();
        assert_eq!(settings.model, "deepseek-ai/DeepSeek-V3");
        assert!(settings.implementation_thought);
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(settings.api_base, "https://api.together.xyz/v1");
        assert_eq!(settings.thought_stop, vec!["</think>".to_string()]);
    }

    #[test]
    fn test_parse_empty_settings() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn test_thought_model_fallback() {
        let mut settings = Settings::default();
        assert_eq!(settings.thought_model_or("coder"), "coder");
        settings.thought_model = Some("deepseek-ai/DeepSeek-R1".to_string());
        assert_eq!(settings.thought_model_or("coder"), "deepseek-ai/DeepSeek-R1");
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yml");
        match Settings::load(Some(&missing)) {
            Err(ConfigError::NotFound(path)) => assert_eq!(path, missing),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tdforge.yml");
        fs::write(&path, "test_max_tokens: [not, a, number]").unwrap();
        assert!(matches!(Settings::load(Some(&path)), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_explicit_credential_wins() {
        let key = resolve_credential(Some("abc".to_string())).unwrap();
        assert_eq!(key, "abc");
    }
}
