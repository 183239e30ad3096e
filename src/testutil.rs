//! Shared test helpers for in-crate tests.

use std::sync::Arc;

use crate::assets::AssetStore;
use crate::config::{
    AppVersion, Config, DeploymentMode, HomeAssistantConfig, PathsConfig, VersionSource,
};
use crate::states::StateProvider;
use crate::storage::ConfigStore;
use crate::AppState;

/// Create a test AppState rooted in a temporary directory, without Home
/// Assistant credentials.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let paths = PathsConfig {
        config_root: temp_dir.path().join("config"),
        live_root: temp_dir.path().join("live"),
        asset_root: temp_dir.path().join("www"),
    };

    let config = Config {
        bind_address: "127.0.0.1:0".to_string(),
        home_assistant: HomeAssistantConfig::default(),
        max_upload_size: 1024 * 1024,
        mode: DeploymentMode::Local,
        paths: paths.clone(),
        version: AppVersion {
            value: "0.0.0-test".to_string(),
            source: VersionSource::Default("test".to_string()),
        },
    };

    let store = ConfigStore::open(&paths.config_root, &paths.live_root)
        .expect("Failed to open test config store");
    let assets = AssetStore::new(&paths.asset_root).expect("Failed to create test asset store");
    let states = StateProvider::new(&config.home_assistant).expect("Failed to build HTTP client");

    Arc::new(AppState {
        assets,
        config,
        states,
        store,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        assert!(state.store.live_path().parent().unwrap().is_dir());
        assert!(state.assets.root().is_dir());
        assert!(!state.states.is_configured());
    }
}
