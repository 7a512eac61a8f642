use colored::*;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::instruction::{DEFAULT_PROMPT_MESSAGE, DEFAULT_WELCOME_MESSAGE};

pub const ENV_CONFIG: &str = "LORE_CONFIG";
pub const ENV_DIR: &str = "LORE_DIR";
pub const ENV_ENDPOINT: &str = "LORE_ENDPOINT";
pub const ENV_MODEL_NAME: &str = "LORE_MODEL_NAME";
pub const ENV_INSTRUCTION_FILE: &str = "LORE_INSTRUCTION_FILE";

/// Main lore configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub agent: AgentConfig,
    pub ui: UiConfig,
    pub paths: PathsConfig,
    pub session: SessionConfig,
    /// Single instruction file with front matter; the instructions directory is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_file: Option<PathBuf>,
    pub log_level: LogLevel,
    /// File this config was read from; `None` means built-in defaults
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

/// Remote agent service connectivity
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub endpoint: Option<String>,
    pub model_name: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Appended as `api-version` query parameter when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub domain: String,
    pub tone_style: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_completion_tokens: u32,
    pub max_prompt_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    pub welcome_message: String,
    pub prompt_message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub template: PathBuf,
    pub instructions: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Never delete the remote thread and agent on exit
    pub keep_on_exit: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

/// Validated connectivity settings, produced by [`Config::service_settings`]
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub endpoint: String,
    pub model_name: String,
    pub api_key: String,
    pub api_version: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model_name: None,
            api_key_env: "LORE_API_KEY".to_string(),
            api_version: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Custom AI Agent".to_string(),
            domain: "the specified domain".to_string(),
            tone_style: "scholarly but approachable".to_string(),
            temperature: 0.1,
            top_p: 0.1,
            max_completion_tokens: 4096,
            max_prompt_tokens: 8192,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            prompt_message: DEFAULT_PROMPT_MESSAGE.to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let lore_dir = Config::lore_dir();

        Self {
            template: lore_dir.join("prompts").join("prompt_template.md"),
            instructions: lore_dir.join("instructions"),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file(config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let mut candidates = Vec::new();
        if let Ok(env_path) = std::env::var(ENV_CONFIG) {
            candidates.push(PathBuf::from(env_path));
        }
        if let Ok(lore_dir) = std::env::var(ENV_DIR) {
            candidates.push(PathBuf::from(lore_dir).join("lore.yaml"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("lore").join("lore.yaml"));
        }
        // ./lore.yaml (for development)
        candidates.push(PathBuf::from("lore.yaml"));

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn_skipped(path, &e),
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let mut config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.loaded_from = Some(path.as_ref().to_path_buf());

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Environment wins over the config file; empty values are ignored
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            log::debug!("service.endpoint overridden by {}", ENV_ENDPOINT);
            self.service.endpoint = Some(endpoint);
        }
        if let Some(model) = lookup(ENV_MODEL_NAME) {
            log::debug!("service.model_name overridden by {}", ENV_MODEL_NAME);
            self.service.model_name = Some(model);
        }
        if let Some(file) = lookup(ENV_INSTRUCTION_FILE) {
            log::debug!("instruction_file overridden by {}", ENV_INSTRUCTION_FILE);
            self.instruction_file = Some(PathBuf::from(file));
        }
    }

    /// Validate connectivity settings; missing endpoint or model name is fatal
    pub fn service_settings(&self) -> Result<ServiceSettings, ConfigError> {
        let model_name = non_blank(self.service.model_name.as_deref()).ok_or(ConfigError::MissingSetting {
            key: "service.model_name",
            env: ENV_MODEL_NAME,
        })?;
        let endpoint = non_blank(self.service.endpoint.as_deref()).ok_or(ConfigError::MissingSetting {
            key: "service.endpoint",
            env: ENV_ENDPOINT,
        })?;
        let api_key = self.api_key().ok_or_else(|| ConfigError::MissingApiKey {
            env: self.service.api_key_env.clone(),
        })?;

        Ok(ServiceSettings {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model_name: model_name.to_string(),
            api_key,
            api_version: self.service.api_version.clone(),
        })
    }

    /// API key from the environment, falling back to `<lore_dir>/.env`
    pub fn api_key(&self) -> Option<String> {
        let env_var = &self.service.api_key_env;

        if let Ok(key) = std::env::var(env_var)
            && !key.trim().is_empty()
        {
            return Some(key);
        }

        let env_file = Self::lore_dir().join(".env");
        let content = fs::read_to_string(&env_file).ok()?;
        read_env_value(&content, env_var)
    }

    /// Resolved template path
    pub fn template_path(&self) -> PathBuf {
        Self::expand_path(&self.paths.template)
    }

    /// Resolved instructions directory
    pub fn instructions_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.instructions)
    }

    /// Resolve a named instruction file: absolute paths and paths that exist
    /// relative to the working directory are used as-is, anything else is
    /// looked up in the instructions directory
    pub fn resolve_instruction_file(&self, name: &Path) -> PathBuf {
        let expanded = Self::expand_path(name);
        if expanded.is_absolute() || expanded.exists() {
            return expanded;
        }
        self.instructions_dir().join(expanded)
    }

    /// Get the lore directory (config, prompts and instructions live here)
    pub fn lore_dir() -> PathBuf {
        std::env::var(ENV_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("lore"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}

/// Logging is not set up while the config loads, so skipped files go to stderr too
fn warn_skipped(path: &Path, err: &eyre::Report) {
    log::warn!("Skipping config {}: {:#}", path.display(), err);
    eprintln!("{} Skipping config {}: {:#}", "⚠".yellow(), path.display(), err);
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Find `key=value` in dotenv-style content
fn read_env_value(content: &str, key: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.is_empty() {
            continue;
        }
        if let Some((k, value)) = line.split_once('=')
            && k.trim() == key
        {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            return Some(value.to_string());
        }
    }
    None
}
