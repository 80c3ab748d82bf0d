/// Configuration management for grepx
///
/// grepx stores configuration in ~/.grepx/config.toml
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// grepx configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Substitution settings
    #[serde(default)]
    pub substitute: SubstituteConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Directory searched when a query names no /target path
    #[serde(default = "default_target")]
    pub default_target: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_target: Some(".".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstituteConfig {
    /// Suffix inserted before the extension of rewritten files.
    /// An empty string overwrites sources in place.
    #[serde(default = "default_name_mangle")]
    pub name_mangle: Option<String>,
}

impl Default for SubstituteConfig {
    fn default() -> Self {
        Self {
            name_mangle: Some(crate::substitute::DEFAULT_NAME_MANGLE.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write engine diagnostics to ~/.grepx/grepx.log
    #[serde(default)]
    pub debug: Option<bool>,
}

impl Config {
    pub fn default_target(&self) -> PathBuf {
        self.search
            .default_target
            .clone()
            .unwrap_or_else(|| ".".to_string())
            .into()
    }

    pub fn name_mangle(&self) -> String {
        self.substitute
            .name_mangle
            .clone()
            .unwrap_or_else(|| crate::substitute::DEFAULT_NAME_MANGLE.to_string())
    }

    pub fn debug(&self) -> bool {
        self.logging.debug.unwrap_or(false)
    }
}

// Default functions for serde
fn default_target() -> Option<String> {
    Some(".".to_string())
}
fn default_name_mangle() -> Option<String> {
    Some(crate::substitute::DEFAULT_NAME_MANGLE.to_string())
}

/// Get the configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;

    let config_dir = home_dir.join(".grepx");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    Ok(config_dir.join("config.toml"))
}

/// Get the default configuration file content with comments
fn get_default_config_content() -> &'static str {
    r#"# grepx Configuration File
#
# This file controls default behavior for grepx. Values set here can be
# overridden by command-line flags.

[search]
# Directory searched when a query names no /target path (default: ".")
default_target = "."

[substitute]
# Suffix inserted before the extension of rewritten files (default: "_sed").
# An empty string makes substitution overwrite files in place.
# THAT IS DESTRUCTIVE AND IRREVERSIBLE; there is no backup and no undo.
name_mangle = "_sed"

[logging]
# Write engine diagnostics to ~/.grepx/grepx.log (default: false)
debug = false
"#
}

/// Save the default commented configuration file
pub fn save_default_config() -> Result<()> {
    let config_path = config_file_path()?;

    fs::write(&config_path, get_default_config_content()).with_context(|| {
        format!(
            "Failed to write default config file: {}",
            config_path.display()
        )
    })?;

    Ok(())
}

/// Load configuration from file, creating default if needed
///
/// If the config file doesn't exist, creates it with defaults and returns them.
/// If the config file is malformed, recreates it with defaults.
pub fn load_config() -> Result<Config> {
    let config_path = config_file_path()?;

    if !config_path.exists() {
        save_default_config()?;
    }

    let config_str = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

    let config: Config = match toml::from_str(&config_str) {
        Ok(config) => config,
        Err(_) => {
            // Config is malformed, recreate with defaults
            save_default_config()?;
            return Ok(Config::default());
        }
    };

    Ok(config)
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(target) = &config.search.default_target {
        if target.is_empty() {
            anyhow::bail!("Invalid default_target: must not be empty");
        }
    }

    if let Some(mangle) = &config.substitute.name_mangle {
        if mangle.contains(std::path::MAIN_SEPARATOR) || mangle.contains('/') {
            anyhow::bail!(
                "Invalid name_mangle: {:?} (must not contain a path separator)",
                mangle
            );
        }
    }

    Ok(())
}
