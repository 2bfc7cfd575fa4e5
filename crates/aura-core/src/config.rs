//! Configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the user override (~/.config/aura/aura.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Environment variables (`AI_BACKEND`, `OLLAMA_HOST`, `OLLAMA_MODEL`) are
//! applied last.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/aura.toml");

#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    pub ai: AiConfig,
    pub chat: ChatConfig,
    pub prompts: PromptsConfig,
}

/// `[ai]` - which language model backend to use
#[derive(Debug, Clone, Serialize)]
pub struct AiConfig {
    pub backend: String,
    pub host: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: "ollama".to_string(),
            host: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_secs: 60,
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[chat]`
#[derive(Debug, Clone, Serialize)]
pub struct ChatConfig {
    pub max_records: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { max_records: 60 }
    }
}

/// `[prompts]`
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptsConfig {
    pub override_dir: Option<PathBuf>,
}

/// Default user override location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aura").join("aura.toml"))
}

impl Config {
    /// Load configuration (explicit path or user override, then embedded
    /// defaults), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => fs::read_to_string(&default_path)
                    .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        let mut config = Self::parse(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse TOML over the built-in defaults; missing keys keep their default
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let mut config = Config::default();

        if let Some(ai) = raw.ai {
            if let Some(backend) = ai.backend {
                config.ai.backend = backend;
            }
            if let Some(host) = ai.host {
                config.ai.host = host;
            }
            if let Some(model) = ai.model {
                config.ai.model = model;
            }
            if let Some(timeout) = ai.timeout_secs {
                config.ai.timeout_secs = timeout;
            }
        }

        if let Some(chat) = raw.chat {
            if let Some(max_records) = chat.max_records {
                if max_records == 0 {
                    return Err(Error::Config("chat.max_records must be at least 1".into()));
                }
                config.chat.max_records = max_records;
            }
        }

        if let Some(prompts) = raw.prompts {
            config.prompts.override_dir = prompts.override_dir;
        }

        Ok(config)
    }

    /// Apply `AI_BACKEND`, `OLLAMA_HOST` and `OLLAMA_MODEL` from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("AI_BACKEND").filter(|v| !v.is_empty()) {
            self.ai.backend = backend;
        }
        if let Some(host) = lookup("OLLAMA_HOST").filter(|v| !v.is_empty()) {
            self.ai.host = host;
        }
        if let Some(model) = lookup("OLLAMA_MODEL").filter(|v| !v.is_empty()) {
            self.ai.model = model;
        }
    }
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    ai: Option<RawAi>,
    chat: Option<RawChat>,
    prompts: Option<RawPrompts>,
}

#[derive(Debug, Deserialize)]
struct RawAi {
    backend: Option<String>,
    host: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    max_records: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawPrompts {
    override_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_embedded_default_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.ai.backend, "ollama");
        assert_eq!(config.ai.model, "llama3.2");
        assert_eq!(config.chat.max_records, 60);
        assert!(config.prompts.override_dir.is_none());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::parse("[ai]\nmodel = \"gemma3\"\n").unwrap();
        assert_eq!(config.ai.model, "gemma3");
        assert_eq!(config.ai.host, "http://localhost:11434");
        assert_eq!(config.ai.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(Config::parse("[ai\nmodel="), Err(Error::Toml(_))));
        assert!(Config::parse("[chat]\nmax_records = 0\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("AI_BACKEND", "mock"), ("OLLAMA_MODEL", ""), ("OLLAMA_HOST", "http://gpu:11434")]
            .into_iter()
            .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.ai.backend, "mock");
        assert_eq!(config.ai.host, "http://gpu:11434");
        // Empty values are ignored
        assert_eq!(config.ai.model, "llama3.2");
    }

    #[test]
    fn test_explicit_missing_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aura.toml");
        fs::write(&path, "[chat]\nmax_records = 10\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.chat.max_records, 10);
    }
}
