//! Application configuration for boardshelf.
//!
//! User config lives at `~/.boardshelf/boardshelf.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BoardshelfError, Result};
use crate::types::RunMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "boardshelf.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".boardshelf";

/// Default database file name inside the config directory.
const DB_FILE_NAME: &str = "boardshelf.db";

// ---------------------------------------------------------------------------
// Config structs (matching boardshelf.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Pipeline run defaults.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Rulebook fetch limits.
    #[serde(default)]
    pub rulebook: RulebookConfig,

    /// Content generator bridge settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// `[database]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file. Defaults to `~/.boardshelf/boardshelf.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Skip entries blocked on a missing rulebook instead of running partially.
    #[serde(default = "default_true")]
    pub skip_blocked: bool,

    /// Halt a batch as soon as one entry fails.
    #[serde(default)]
    pub stop_on_error: bool,

    /// Run mode used when the caller does not pick one.
    #[serde(default)]
    pub default_mode: RunMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            skip_blocked: true,
            stop_on_error: false,
            default_mode: RunMode::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[rulebook]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulebookConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest rulebook document accepted, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Redirects followed before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for RulebookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_bytes() -> u64 {
    20 * 1024 * 1024
}
fn default_max_redirects() -> usize {
    5
}

/// Quality tier requested from the content generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    #[default]
    Standard,
    Premium,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

/// `[generator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Bridge command (e.g., "bun").
    #[serde(default = "default_bridge_cmd")]
    pub bridge_cmd: String,

    /// Bridge script path, relative to `working_dir`.
    #[serde(default = "default_bridge_script")]
    pub bridge_script: String,

    /// Working directory for the bridge subprocess. Defaults to the current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Model identifier passed to the bridge.
    #[serde(default = "default_model")]
    pub model: String,

    /// Quality tier passed to the bridge.
    #[serde(default)]
    pub quality_tier: QualityTier,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            bridge_cmd: default_bridge_cmd(),
            bridge_script: default_bridge_script(),
            working_dir: None,
            model: default_model(),
            quality_tier: QualityTier::default(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_bridge_cmd() -> String {
    "bun".into()
}
fn default_bridge_script() -> String {
    "packages/ts/content-bridge/src/bridge.ts".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.boardshelf/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BoardshelfError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.boardshelf/boardshelf.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the database path: explicit config value, else the default location.
pub fn database_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.database.path {
        Some(path) => Ok(PathBuf::from(path)),
        None => Ok(config_dir()?.join(DB_FILE_NAME)),
    }
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
    let content = std::fs::read_to_string(path).map_err(|e| BoardshelfError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BoardshelfError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BoardshelfError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BoardshelfError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BoardshelfError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the generator API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.generator.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(BoardshelfError::config(format!(
            "content generator API key not found. Set the {var_name} environment variable."
        ))),
    }
}
