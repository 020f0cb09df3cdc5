//! Storage Layer
//!
//! Handles persistence of the document log as JSON in the platform data directory.

pub mod documents;

use anyhow::Result;
use std::path::PathBuf;

pub use documents::{DocumentDraft, DocumentStore, FormField};

/// File name of the document log inside the data directory
pub const DOCUMENTS_FILE: &str = "documents.json";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "docscan", "DocScan")
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let proj_dirs = project_dirs().ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = project_dirs().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Default location of the document log
pub fn default_documents_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DOCUMENTS_FILE))
}
