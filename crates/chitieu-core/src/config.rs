//! Application configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/chitieu/config.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Environment variables are applied on top of whichever file was used.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/chitieu.toml");

/// Which language-model backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Ollama,
    OpenAICompatible,
    Mock,
    /// Rules only
    None,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAICompatible => "openai_compatible",
            Self::Mock => "mock",
            Self::None => "none",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai_compatible" | "openai" | "gemini" | "vllm" | "localai" | "llamacpp" => {
                Ok(Self::OpenAICompatible)
            }
            "mock" => Ok(Self::Mock),
            "none" | "off" | "rules" => Ok(Self::None),
            _ => Err(format!("Unknown LLM backend: {}", s)),
        }
    }
}

/// Where synced records go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncTarget {
    #[default]
    Csv,
    Sheets,
}

impl SyncTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Sheets => "sheets",
        }
    }
}

impl std::str::FromStr for SyncTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "sheets" | "google_sheets" => Ok(Self::Sheets),
            _ => Err(format!("Unknown sync destination: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserConfig {
    pub name: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: "default_user".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub backend: BackendKind,
    pub host: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    pub timeout: Duration,
    pub min_confidence: f64,
}

impl LlmConfig {
    /// API key read from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Ollama,
            host: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            api_key_env: None,
            timeout: Duration::from_secs(10),
            min_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub enabled: bool,
    pub destination: SyncTarget,
    pub csv_path: Option<PathBuf>,
    pub spreadsheet_id: Option<String>,
    pub sheet: String,
    /// Environment variable holding the Sheets bearer token
    pub token_env: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            destination: SyncTarget::Csv,
            csv_path: None,
            spreadsheet_id: None,
            sheet: "Chi tiêu".to_string(),
            token_env: "GOOGLE_SHEETS_TOKEN".to_string(),
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub user: UserConfig,
    pub llm: LlmConfig,
    pub sync: SyncConfig,
    /// File the config was read from (None for embedded defaults)
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load config from `path`, the override location, or embedded defaults,
    /// then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = load_config(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Embedded defaults only, no environment
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("AI_BACKEND") {
            match backend.parse() {
                Ok(kind) => self.llm.backend = kind,
                Err(e) => warn!("{}, keeping {}", e, self.llm.backend.as_str()),
            }
        }

        let (host_var, model_var) = match self.llm.backend {
            BackendKind::OpenAICompatible => ("OPENAI_COMPATIBLE_HOST", "OPENAI_COMPATIBLE_MODEL"),
            _ => ("OLLAMA_HOST", "OLLAMA_MODEL"),
        };
        if let Some(host) = lookup(host_var) {
            self.llm.host = host;
        }
        if let Some(model) = lookup(model_var) {
            self.llm.model = model;
        }
        if self.llm.backend == BackendKind::OpenAICompatible
            && lookup("OPENAI_COMPATIBLE_API_KEY").is_some()
        {
            self.llm.api_key_env = Some("OPENAI_COMPATIBLE_API_KEY".to_string());
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("chitieu").join("config.toml"))
}

/// Default database path
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("chitieu").join("chitieu.db"))
        .unwrap_or_else(|| PathBuf::from("chitieu.db"))
}

/// Load configuration (explicit path, then override, then default)
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        // An explicit path must exist
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut config = parse_config(&content)?;
        config.source = Some(path.to_path_buf());
        return Ok(config);
    }

    if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let content = fs::read_to_string(&default_path)
                .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
            let mut config = parse_config(&content)?;
            config.source = Some(default_path);
            return Ok(config);
        }
    }

    parse_config(DEFAULT_CONFIG)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    user: Option<RawUser>,
    llm: Option<RawLlm>,
    sync: Option<RawSync>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLlm {
    backend: Option<String>,
    host: Option<String>,
    model: Option<String>,
    api_key_env: Option<String>,
    timeout_secs: Option<u64>,
    min_confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSync {
    enabled: Option<bool>,
    destination: Option<String>,
    csv_path: Option<PathBuf>,
    spreadsheet_id: Option<String>,
    sheet: Option<String>,
    token_env: Option<String>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = Config::default();

    if let Some(user) = raw.user {
        if let Some(name) = user.name.filter(|n| !n.trim().is_empty()) {
            config.user.name = name;
        }
    }

    if let Some(llm) = raw.llm {
        if let Some(backend) = llm.backend {
            config.llm.backend = backend.parse().map_err(Error::Config)?;
        }
        if let Some(host) = llm.host {
            config.llm.host = host;
        }
        if let Some(model) = llm.model {
            config.llm.model = model;
        }
        config.llm.api_key_env = llm.api_key_env.filter(|v| !v.is_empty());
        if let Some(timeout) = llm.timeout_secs {
            config.llm.timeout = Duration::from_secs(timeout);
        }
        if let Some(min) = llm.min_confidence {
            if !(0.0..=1.0).contains(&min) {
                return Err(Error::Config(format!(
                    "min_confidence must be between 0 and 1, got {}",
                    min
                )));
            }
            config.llm.min_confidence = min;
        }
    }

    if let Some(sync) = raw.sync {
        if let Some(enabled) = sync.enabled {
            config.sync.enabled = enabled;
        }
        if let Some(destination) = sync.destination {
            config.sync.destination = destination.parse().map_err(Error::Config)?;
        }
        config.sync.csv_path = sync.csv_path;
        config.sync.spreadsheet_id = sync.spreadsheet_id.filter(|v| !v.is_empty());
        if let Some(sheet) = sync.sheet {
            config.sync.sheet = sheet;
        }
        if let Some(token_env) = sync.token_env {
            config.sync.token_env = token_env;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.user.name, "default_user");
        assert_eq!(config.llm.backend, BackendKind::Ollama);
        assert_eq!(config.llm.timeout, Duration::from_secs(10));
        assert!(!config.sync.enabled);
        assert_eq!(config.sync.destination, SyncTarget::Csv);
        assert!(config.sync.spreadsheet_id.is_none());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config("[llm]\nbackend = \"none\"\n").unwrap();
        assert_eq!(config.llm.backend, BackendKind::None);
        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.user.name, "default_user");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse_config("[llm]\nbackend = \"skynet\"\n").is_err());
        assert!(parse_config("[llm]\nmin_confidence = 1.5\n").is_err());
        assert!(parse_config("[sync]\ndestination = \"ftp\"\n").is_err());
        assert!(parse_config("not toml [").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AI_BACKEND", "openai_compatible"),
            ("OPENAI_COMPATIBLE_HOST", "http://gpu:8000"),
            ("OPENAI_COMPATIBLE_MODEL", "qwen2.5"),
            ("OLLAMA_HOST", "http://ignored:11434"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::embedded().unwrap();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.backend, BackendKind::OpenAICompatible);
        assert_eq!(config.llm.host, "http://gpu:8000");
        assert_eq!(config.llm.model, "qwen2.5");
    }

    #[test]
    fn test_unknown_backend_env_ignored() {
        let mut config = Config::embedded().unwrap();
        config.apply_env(|k| (k == "AI_BACKEND").then(|| "skynet".to_string()));
        assert_eq!(config.llm.backend, BackendKind::Ollama);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[user]\nname = \"lan\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.user.name, "lan");
        assert_eq!(config.source.as_deref(), Some(path.as_path()));

        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
