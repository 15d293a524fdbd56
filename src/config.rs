//! Per-workspace configuration.
//!
//! Lives at `<root>/.endpointer/config.json`. A missing file is created with
//! all-empty defaults; a malformed one is logged and replaced by defaults in
//! memory only, so a user's half-edited file is never overwritten.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".endpointer";
pub const CONFIG_FILE: &str = "config.json";

/// Which files feed one side of the cross-reference.
///
/// Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SideConfig {
    pub include_folders: Vec<String>,
    pub include_extensions: Vec<String>,
}

impl SideConfig {
    pub fn is_unrestricted(&self) -> bool {
        self.include_folders.is_empty() && self.include_extensions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointerConfig {
    pub frontend: SideConfig,
    pub backend: SideConfig,
}

pub fn config_dir(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    config_dir(root).join(CONFIG_FILE)
}

/// Read the config if it exists.
pub fn try_load_config(root: &Path) -> Result<Option<EndpointerConfig>, ConfigError> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = serde_json::from_slice(&data)
        .map_err(|source| ConfigError::Parse { path, source })?;
    Ok(Some(config))
}

pub fn save_config(root: &Path, config: &EndpointerConfig) -> Result<PathBuf, ConfigError> {
    let dir = config_dir(root);
    fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
        path: dir.clone(),
        source,
    })?;
    let path = config_path(root);
    let mut data = serde_json::to_vec_pretty(config).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    data.push(b'\n');
    fs::write(&path, data).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Load the workspace config, creating it with defaults when absent.
///
/// Never fails: every problem degrades to the default config plus a warning.
pub fn load_config(root: &Path) -> EndpointerConfig {
    match try_load_config(root) {
        Ok(Some(config)) => config,
        Ok(None) => {
            let config = EndpointerConfig::default();
            match save_config(root, &config) {
                Ok(path) => tracing::debug!("Created default config at {}", path.display()),
                Err(e) => tracing::warn!("Could not create default config: {}", e),
            }
            config
        }
        Err(e) => {
            tracing::warn!("{}; falling back to defaults", e);
            EndpointerConfig::default()
        }
    }
}
