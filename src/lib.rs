//! panel-config - configuration authoring backend for smart-panel widgets
//!
//! This crate provides:
//! - Staged site configuration with backups and atomic promotion to live
//! - A structural JPEG gate for slideshow uploads (no pixel decoding)
//! - Path sandboxing for client-supplied directories and file names
//! - Declarative schema checks for devices and widgets
//! - Optional Home Assistant entity lookups
//! - REST API over all of the above

pub mod api;
pub mod assets;
pub mod config;
pub mod error;
pub mod sandbox;
pub mod schema;
pub mod states;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use config::Config;
use states::StateProvider;
use storage::ConfigStore;

/// Shared application state
pub struct AppState {
    pub assets: assets::AssetStore,
    pub config: Config,
    pub states: StateProvider,
    pub store: ConfigStore,
}
