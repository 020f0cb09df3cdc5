//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::{PreprocessOptions, SegmentationMode};

/// File name of the configuration inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scanner and recognition settings
    pub scanner: ScannerSettings,
    /// Document log location
    pub storage: StorageSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// Scanner and recognition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Text granularity the scanner starts in
    pub default_mode: SegmentationMode,
    /// Treat images as light text on a dark background
    pub invert: bool,
    /// Recognition language code(s), e.g. "eng" or "eng+fil"
    pub language: String,
    /// Resolution hint passed to the engine
    pub dpi: u32,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            default_mode: SegmentationMode::Paragraph,
            invert: false,
            language: "eng".to_string(),
            dpi: crate::vision::ocr::DEFAULT_DPI,
        }
    }
}

impl ScannerSettings {
    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions::new(self.default_mode, self.invert)
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Document log path; the platform data directory when unset
    pub documents_file: Option<PathBuf>,
}

impl StorageSettings {
    /// Configured document log path, or the default one
    pub fn documents_path(&self) -> Result<PathBuf> {
        match &self.documents_file {
            Some(path) => Ok(path.clone()),
            None => crate::storage::default_documents_path(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load the configuration at `path`, writing defaults if it does not exist yet
pub fn load_or_create_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
    } else {
        let config = AppConfig::default();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        save_config(&config, path).with_context(|| format!("Failed to write default config to {:?}", path))?;
        Ok(config)
    }
}

/// Default configuration path in the platform config directory
pub fn default_config_path() -> Result<PathBuf> {
    Ok(crate::storage::get_config_dir()?.join(CONFIG_FILE))
}
