//! Application configuration for the content pipeline.
//!
//! User config lives at `~/.contentpipe/contentpipe.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ContentPipelineError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contentpipe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contentpipe";

// ---------------------------------------------------------------------------
// Config structs (matching contentpipe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat-completion gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8787
}

/// `[gateway]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Full URL of the chat-completion endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with every stage.
    #[serde(default = "default_model")]
    pub model: String,

    /// Transport timeout per upstream call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "LOVABLE_API_KEY".into()
}
fn default_endpoint() -> String {
    "https://ai.gateway.lovable.dev/v1/chat/completions".into()
}
fn default_model() -> String {
    "google/gemini-2.5-flash".into()
}
fn default_timeout_secs() -> u64 {
    300
}

impl GatewayConfig {
    /// Check the endpoint and model before a client is built from them.
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            ContentPipelineError::config(format!("invalid gateway endpoint '{}': {e}", self.endpoint))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ContentPipelineError::config(format!(
                "gateway endpoint must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ContentPipelineError::config("gateway model must not be empty"));
        }
        Ok(url)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.contentpipe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ContentPipelineError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contentpipe/contentpipe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ContentPipelineError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ContentPipelineError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ContentPipelineError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ContentPipelineError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ContentPipelineError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the env var named in the gateway config.
///
/// An unset or empty variable is a configuration error.
pub fn resolve_api_key(config: &GatewayConfig) -> Result<String> {
    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ContentPipelineError::config(format!(
            "{var_name} is not configured"
        ))),
    }
}
