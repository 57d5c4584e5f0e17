//! Application configuration.
//!
//! Loaded from `<config_dir>/campus-sync/config.toml` with environment
//! variable overrides for the secrets. The resulting [`Config`] is passed
//! explicitly into clients and services - there is no global state.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Connection settings for one HTTP backend.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: String,
}

/// Remote drive store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    /// Identifier of the folder under which term workspaces are provisioned.
    #[serde(default = "default_root_folder")]
    pub root_folder_id: String,
}

fn default_root_folder() -> String {
    "root".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("tmp/oec")
}

/// Top-level configuration for a sync run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub canvas: EndpointConfig,
    pub registrar: EndpointConfig,
    pub drive: DriveConfig,
    /// Local staging directory for diff artifacts and task logs.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(dir.join("campus-sync").join("config.toml"))
    }

    /// Load configuration from the given TOML file, then apply environment
    /// overrides for the tokens (`CANVAS_TOKEN`, `REGISTRAR_TOKEN`,
    /// `DRIVE_TOKEN`).
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Ok(token) = std::env::var("CANVAS_TOKEN") {
            config.canvas.token = token;
        }
        if let Ok(token) = std::env::var("REGISTRAR_TOKEN") {
            config.registrar.token = token;
        }
        if let Ok(token) = std::env::var("DRIVE_TOKEN") {
            config.drive.token = token;
        }

        Ok(config)
    }
}
