use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "INTERNLOG_API_KEY";
pub const LOG_LEVEL_ENV: &str = "INTERNLOG_LOG";

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assist: AssistConfig,
    pub logging: LoggingConfig,
}

/// Chat-completions endpoint used for text improvement and summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl Default for AssistConfig {
    fn default() -> Self {
        AssistConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "internlog").context("locating config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Loads `path` (or the default location), then applies environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    let mut config = read_config(&path)?;
    apply_env(
        &mut config,
        env::var(API_KEY_ENV).ok(),
        env::var(LOG_LEVEL_ENV).ok(),
    );
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    toml::from_str(&data).with_context(|| format!("parsing {:?}", path))
}

fn apply_env(config: &mut Config, api_key: Option<String>, level: Option<String>) {
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        config.assist.api_key = Some(key);
    }
    if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
        config.logging.level = Some(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = read_config(&tmp.path().join("config.toml")).unwrap();
        assert!(config.assist.api_key.is_none());
        assert_eq!(config.assist.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.assist.timeout_secs, 30);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            "[assist]\napi_key = \"sk-test\"\nmodel = \"openai/gpt-4o-mini\"\n\n[logging]\nlevel = \"trace\"\n",
        )
        .unwrap();
        let config = read_config(&path).unwrap();
        assert_eq!(config.assist.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.assist.model, "openai/gpt-4o-mini");
        assert_eq!(config.assist.max_tokens, 1024);
        assert_eq!(config.logging.level.as_deref(), Some("trace"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[assist\n").unwrap();
        assert!(read_config(&path).is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = Config::default();
        config.assist.api_key = Some("from-file".into());
        apply_env(&mut config, Some("from-env".into()), Some("  ".into()));
        assert_eq!(config.assist.api_key.as_deref(), Some("from-env"));
        assert!(config.logging.level.is_none());
    }
}
