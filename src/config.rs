use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub shell: ShellConfig,
}

/// Configuration for the natural-language assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// API key; ANTHROPIC_API_KEY is used when unset (see `resolved_api_key`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Base URL for the API (optional, for proxies or custom endpoints)
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Configuration for command execution and session bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Interpreter every non-builtin line is handed to (default: zsh)
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Ask the assistant to explain failed commands (default: true)
    #[serde(default = "default_true")]
    pub auto_help: bool,

    /// Number of recent entries shared with the assistant (default: 20)
    #[serde(default = "default_context_size")]
    pub context_size: usize,

    /// Output characters kept per context entry before truncation (default: 10k)
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,

    /// Lines of input history kept by the line editor (default: 1000)
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> usize {
    1024
}

fn default_interpreter() -> String {
    "zsh".to_string()
}

fn default_true() -> bool {
    true
}

fn default_context_size() -> usize {
    20
}

fn default_max_output_chars() -> usize {
    10_000
}

fn default_history_size() -> usize {
    1000
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: None,
        }
    }
}

impl AssistantConfig {
    /// The configured key, else ANTHROPIC_API_KEY. Never stored back into
    /// the config so an environment secret is not written to disk.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            auto_help: true,
            context_size: default_context_size(),
            max_output_chars: default_max_output_chars(),
            history_size: default_history_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant: AssistantConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;
        Ok(config_dir.join("uterm").join("config.toml"))
    }

    /// Where the line editor keeps its history between sessions
    pub fn history_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("uterm").join("history.txt"))
    }
}
