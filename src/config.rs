use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Present when running as a Home Assistant add-on.
const ADDON_CONFIG_DIR: &str = "/config";
const SUPERVISOR_API: &str = "http://supervisor/core/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Home Assistant add-on: `/config` is mounted and a supervisor token is set.
    Addon,
    /// Local development with paths under `./config_data`.
    Local,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub home_assistant: HomeAssistantConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
    pub mode: DeploymentMode,
    pub paths: PathsConfig,
    pub version: AppVersion,
}

#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Staging slots and backups
    pub config_root: PathBuf,
    /// Directory holding the published `site_settings.json`
    pub live_root: PathBuf,
    /// Root under which slideshow images are stored
    pub asset_root: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct HomeAssistantConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
}

/// The add-on version and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct AppVersion {
    pub value: String,
    pub source: VersionSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VersionSource {
    /// Read from the add-on manifest at this path.
    Manifest(PathBuf),
    /// The manifest was missing or unusable; the crate version is used.
    Default(String),
}

#[derive(Deserialize)]
struct AddonManifest {
    version: Option<String>,
}

impl AppVersion {
    /// Read `version` from the add-on's YAML manifest, falling back to the
    /// crate version with the reason recorded.
    pub fn load(manifest: &Path) -> Self {
        let fallback = |reason: String| AppVersion {
            value: env!("CARGO_PKG_VERSION").to_string(),
            source: VersionSource::Default(reason),
        };

        let raw = match std::fs::read_to_string(manifest) {
            Ok(raw) => raw,
            Err(e) => return fallback(format!("{}: {e}", manifest.display())),
        };

        match serde_yaml::from_str::<AddonManifest>(&raw) {
            Ok(AddonManifest {
                version: Some(value),
            }) => AppVersion {
                value,
                source: VersionSource::Manifest(manifest.to_path_buf()),
            },
            Ok(_) => fallback(format!("{}: no version key", manifest.display())),
            Err(e) => fallback(format!("{}: {e}", manifest.display())),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            Path::new(ADDON_CONFIG_DIR).exists(),
        )
    }

    /// Build configuration from an arbitrary variable lookup. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F, addon_dir_exists: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = var("SUPERVISOR_TOKEN");
        let mode = if addon_dir_exists && token.is_some() {
            DeploymentMode::Addon
        } else {
            DeploymentMode::Local
        };

        let api_url = var("HA_API").or_else(|| token.as_ref().map(|_| SUPERVISOR_API.to_string()));

        let config_root = var("CONFIG_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| match mode {
                DeploymentMode::Addon => PathBuf::from("/config/panel_widgets"),
                DeploymentMode::Local => PathBuf::from("./config_data"),
            });
        let live_root = var("LIVE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| match mode {
                DeploymentMode::Addon => PathBuf::from("/config/www/panel_widgets"),
                DeploymentMode::Local => config_root.join("live"),
            });
        let asset_root = var("ASSET_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| match mode {
                DeploymentMode::Addon => PathBuf::from("/config/www"),
                DeploymentMode::Local => config_root.join("www"),
            });

        let bind_address = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8099".to_string());

        let max_upload_size = var("MAX_UPLOAD_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(10 * 1024 * 1024); // 10MB

        let manifest = var("ADDON_MANIFEST")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.yaml"));

        let config = Config {
            bind_address,
            home_assistant: HomeAssistantConfig { api_url, token },
            max_upload_size,
            mode,
            paths: PathsConfig {
                config_root,
                live_root,
                asset_root,
            },
            version: AppVersion::load(&manifest),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::ValidationError(
                "BIND_ADDRESS cannot be empty".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.home_assistant.token.is_some() && self.home_assistant.api_url.is_none() {
            return Err(ConfigError::ValidationError(
                "HA_API is required when SUPERVISOR_TOKEN is set".to_string(),
            ));
        }

        if self.home_assistant.token.is_none() {
            tracing::warn!(
                "SUPERVISOR_TOKEN is not set. Entity lookups will return simulated results."
            );
        }

        Ok(())
    }

    pub fn is_addon(&self) -> bool {
        self.mode == DeploymentMode::Addon
    }
}
