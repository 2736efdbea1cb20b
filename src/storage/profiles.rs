//! User configuration storage.
//!
//! Handles saving and loading named fan profiles and defaults to/from disk.
//! Cross-platform: uses appropriate config directories for each OS.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AsetekError, Result};

// =============================================================================
// Config Path
// =============================================================================

pub(crate) const APP_NAME: &str = "asetek-rust";
const CONFIG_FILE: &str = "config.json";

/// Get the configuration directory path.
/// - Linux: ~/.config/asetek-rust/
/// - Windows: %APPDATA%\asetek-rust\
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(APP_NAME))
        .ok_or_else(|| AsetekError::Storage("Could not find config directory".into()))
}

/// Get the full path to the config file.
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

// =============================================================================
// Storage Structures
// =============================================================================

/// Main configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Run every command in dry-run mode unless overridden.
    #[serde(default)]
    pub dry_run: bool,
    /// Named fan profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, StoredFanProfile>,
}

/// Stored fan profile, kept as the user entered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFanProfile {
    pub points: Vec<(i32, i32)>,
}

// =============================================================================
// Storage Functions
// =============================================================================

/// Load configuration from `path`, or defaults if it does not exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| AsetekError::Storage(format!("Failed to read config: {}", e)))?;

    serde_json::from_str(&content)
        .map_err(|e| AsetekError::Storage(format!("Failed to parse config: {}", e)))
}

/// Save configuration to `path`, creating its directory if needed.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| AsetekError::Storage(format!("Failed to create config dir: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AsetekError::Storage(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, content)
        .map_err(|e| AsetekError::Storage(format!("Failed to write config: {}", e)))?;

    Ok(())
}

/// Load configuration from disk.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&get_config_path()?)
}

/// Save configuration to disk.
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(&get_config_path()?, config)
}

impl AppConfig {
    /// Get a fan profile by name.
    pub fn profile(&self, name: &str) -> Result<&StoredFanProfile> {
        self.profiles
            .get(&name.to_lowercase())
            .ok_or_else(|| AsetekError::InvalidProfile(format!("Profile '{}' not found", name)))
    }

    /// Insert or replace a fan profile.
    pub fn set_profile(&mut self, name: &str, points: Vec<(i32, i32)>) {
        self.profiles
            .insert(name.to_lowercase(), StoredFanProfile { points });
    }
}
