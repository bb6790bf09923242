//! Configuration loading, validation, and management for ToneShift.
//!
//! Loads configuration from `~/.toneshift/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.toneshift/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text-generation endpoint
    #[serde(default)]
    pub generation: GenerationConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Backing store
    #[serde(default)]
    pub storage: StorageConfig,

    /// Prompt and fan-out tuning
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL; `/generate` is appended
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on a single generation call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:11434/api".into()
}
fn default_model() -> String {
    "llama3".into()
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// CORS origins. Empty = any origin (the mobile client has none).
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
            allowed_origins: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// SQLite database file
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_backend() -> String {
    "sqlite".into()
}
fn default_storage_path() -> String {
    AppConfig::config_dir()
        .join("toneshift.db")
        .to_string_lossy()
        .into_owned()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Trailing messages included as "Recent conversation"
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Cap on the assembled context block in characters (0 = unbounded)
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Last-resort tones when neither relationship nor user supply any
    #[serde(default = "default_fallback_tones")]
    pub fallback_tones: Vec<String>,
}

fn default_history_window() -> usize {
    3
}
fn default_max_context_chars() -> usize {
    8000
}
fn default_fallback_tones() -> Vec<String> {
    vec!["professional".into(), "casual".into(), "friendly".into()]
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            max_context_chars: default_max_context_chars(),
            fallback_tones: default_fallback_tones(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.toneshift/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `OLLAMA_API_URL`, `OLLAMA_MODEL`
    /// - `TONESHIFT_PORT`, `TONESHIFT_DATABASE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = lookup("OLLAMA_API_URL") {
            self.generation.api_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.generation.model = model;
        }
        if let Some(port) = lookup("TONESHIFT_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("TONESHIFT_PORT is not a port: {port}"))
            })?;
        }
        if let Some(path) = lookup("TONESHIFT_DATABASE") {
            self.storage.path = path;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".toneshift")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "generation.api_url must not be empty".into(),
            ));
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "generation.model must not be empty".into(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.timeout_secs must be > 0".into(),
            ));
        }
        if self.orchestration.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "orchestration.history_window must be > 0".into(),
            ));
        }
        if self.orchestration.fallback_tones.is_empty() {
            return Err(ConfigError::ValidationError(
                "orchestration.fallback_tones must name at least one tone".into(),
            ));
        }
        if !matches!(self.storage.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown storage.backend '{}' (use 'sqlite' or 'memory')",
                self.storage.backend
            )));
        }
        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.generation.timeout_secs, 30);
        assert_eq!(config.orchestration.history_window, 3);
        assert_eq!(
            config.orchestration.fallback_tones,
            vec!["professional", "casual", "friendly"]
        );
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.generation.model, config.generation.model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.generation.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_fallback_tones_rejected() {
        let mut config = AppConfig::default();
        config.orchestration.fallback_tones.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.storage.backend = "mongodb".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.generation.model, "llama3");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[generation]
model = "mistral"

[orchestration]
history_window = 5
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.generation.model, "mistral");
        assert_eq!(config.generation.timeout_secs, 30);
        assert_eq!(config.orchestration.history_window, 5);
        assert_eq!(config.orchestration.max_context_chars, 8000);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[generation\nmodel = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OLLAMA_API_URL", "http://gpu-box:11434/api"),
            ("OLLAMA_MODEL", "phi3"),
            ("TONESHIFT_PORT", "8088"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.generation.api_url, "http://gpu-box:11434/api");
        assert_eq!(config.generation.model, "phi3");
        assert_eq!(config.gateway.port, 8088);
    }

    #[test]
    fn bad_port_env_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|k| (k == "TONESHIFT_PORT").then(|| "http".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("llama3"));
        assert!(toml_str.contains("5000"));
    }
}
