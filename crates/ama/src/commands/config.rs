//! Config command implementation.
//!
//! The config file is TOML, located at `$AMA_CONFIG`, else
//! `$XDG_CONFIG_HOME/ama/config.toml`, else `~/.config/ama/config.toml`:
//!
//! ```toml
//! base_url = "https://api.atmyapp.com"
//! api_key = "..."
//! client_mode = "with-fallback"
//! plugins = ["static-url"]
//! preview_key = "..."
//!
//! [local_storage]
//! path = ".ama/local"
//! timeout_ms = 500
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;

use atmyapp_local_rs::CollectionsConfig;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use super::{print_json, CommandContext, CommandError, Result};

/// Minimum key length to apply masking (show first and last N characters).
const KEY_MASK_MIN_LENGTH: usize = 8;

/// Number of characters to show at start/end of a masked key.
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API base URL (default: the hosted service).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key (optional, can use env var instead).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Collections client settings.
    #[serde(flatten)]
    pub collections: CollectionsConfig,
}

/// Gets the config file path.
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var("AMA_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config).join("ama").join("config.toml"));
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("ama").join("config.toml"))
        .ok_or_else(|| CommandError::Config("Could not determine config directory".to_string()))
}

/// Loads the configuration from disk. A missing file is the default config.
pub fn load_config() -> Result<Config> {
    let path = get_config_path()?;

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| CommandError::Config(format!("Failed to read config: {}", e)))?;

    toml::from_str(&content)
        .map_err(|e| CommandError::Config(format!("Failed to parse config: {}", e)))
}

/// Executes the config show command.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path()?;

    let mut config = ctx.config.clone();
    config.api_key = config.api_key.as_deref().map(mask_key);

    let output = serde_json::json!({
        "path": path.display().to_string(),
        "exists": path.exists(),
        "config": config,
    });
    print_json(&output)
}

/// Executes the config path command.
pub fn execute_path() -> Result<()> {
    let path = get_config_path()?;
    println!("{}", path.display());
    Ok(())
}

fn mask_key(key: &str) -> String {
    let char_count = key.chars().count();
    if char_count > KEY_MASK_MIN_LENGTH {
        let prefix: String = key.chars().take(KEY_MASK_VISIBLE_CHARS).collect();
        let suffix: String = key.chars().skip(char_count - KEY_MASK_VISIBLE_CHARS).collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "****".to_string()
    }
}
