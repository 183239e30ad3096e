use std::collections::HashMap;
use std::path::PathBuf;

use panel_config::config::{AppVersion, Config, ConfigError, DeploymentMode, VersionSource};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_local_defaults() {
    let config = Config::from_lookup(lookup(&[("ADDON_MANIFEST", "/nonexistent.yaml")]), false)
        .unwrap();

    assert_eq!(config.mode, DeploymentMode::Local);
    assert!(!config.is_addon());
    assert_eq!(config.bind_address, "0.0.0.0:8099");
    assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
    assert_eq!(config.paths.config_root, PathBuf::from("./config_data"));
    assert_eq!(config.paths.live_root, PathBuf::from("./config_data/live"));
    assert_eq!(config.paths.asset_root, PathBuf::from("./config_data/www"));
    assert_eq!(config.home_assistant.api_url, None);
    assert_eq!(config.home_assistant.token, None);
}

#[test]
fn test_addon_mode_requires_token_and_config_dir() {
    let vars = [
        ("SUPERVISOR_TOKEN", "secret"),
        ("ADDON_MANIFEST", "/nonexistent.yaml"),
    ];

    let addon = Config::from_lookup(lookup(&vars), true).unwrap();
    assert_eq!(addon.mode, DeploymentMode::Addon);
    assert_eq!(addon.paths.config_root, PathBuf::from("/config/panel_widgets"));
    assert_eq!(addon.paths.live_root, PathBuf::from("/config/www/panel_widgets"));
    assert_eq!(addon.paths.asset_root, PathBuf::from("/config/www"));
    assert_eq!(
        addon.home_assistant.api_url.as_deref(),
        Some("http://supervisor/core/api")
    );

    // Token without the add-on directory stays local
    let local = Config::from_lookup(lookup(&vars), false).unwrap();
    assert_eq!(local.mode, DeploymentMode::Local);
    assert_eq!(local.home_assistant.token.as_deref(), Some("secret"));

    // Directory without a token stays local
    let local = Config::from_lookup(lookup(&[("ADDON_MANIFEST", "/nonexistent.yaml")]), true)
        .unwrap();
    assert_eq!(local.mode, DeploymentMode::Local);
}

#[test]
fn test_overrides() {
    let config = Config::from_lookup(
        lookup(&[
            ("BIND_ADDRESS", "127.0.0.1:9000"),
            ("CONFIG_ROOT", "/data/cfg"),
            ("LIVE_ROOT", "/data/live"),
            ("ASSET_ROOT", "/data/www"),
            ("HA_API", "http://ha.local:8123/api"),
            ("MAX_UPLOAD_SIZE", "2048"),
            ("ADDON_MANIFEST", "/nonexistent.yaml"),
        ]),
        false,
    )
    .unwrap();

    assert_eq!(config.bind_address, "127.0.0.1:9000");
    assert_eq!(config.paths.config_root, PathBuf::from("/data/cfg"));
    assert_eq!(config.paths.live_root, PathBuf::from("/data/live"));
    assert_eq!(config.paths.asset_root, PathBuf::from("/data/www"));
    assert_eq!(
        config.home_assistant.api_url.as_deref(),
        Some("http://ha.local:8123/api")
    );
    assert_eq!(config.max_upload_size, 2048);
}

#[test]
fn test_local_paths_follow_config_root() {
    let config = Config::from_lookup(
        lookup(&[
            ("CONFIG_ROOT", "/srv/panels"),
            ("ADDON_MANIFEST", "/nonexistent.yaml"),
        ]),
        false,
    )
    .unwrap();

    assert_eq!(config.paths.live_root, PathBuf::from("/srv/panels/live"));
    assert_eq!(config.paths.asset_root, PathBuf::from("/srv/panels/www"));
}

#[test]
fn test_blank_values_count_as_unset() {
    let config = Config::from_lookup(
        lookup(&[
            ("BIND_ADDRESS", "  "),
            ("SUPERVISOR_TOKEN", ""),
            ("ADDON_MANIFEST", "/nonexistent.yaml"),
        ]),
        false,
    )
    .unwrap();

    assert_eq!(config.bind_address, "0.0.0.0:8099");
    assert_eq!(config.home_assistant.token, None);
}

#[test]
fn test_zero_upload_size_is_rejected() {
    let err = Config::from_lookup(
        lookup(&[
            ("MAX_UPLOAD_SIZE", "0"),
            ("ADDON_MANIFEST", "/nonexistent.yaml"),
        ]),
        false,
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("MAX_UPLOAD_SIZE")));
}

#[test]
fn test_version_from_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("config.yaml");
    std::fs::write(
        &manifest,
        "name: Panel Config\nversion: \"2.3.1\"\nslug: panel_config\n",
    )
    .unwrap();

    let version = AppVersion::load(&manifest);

    assert_eq!(version.value, "2.3.1");
    assert_eq!(version.source, VersionSource::Manifest(manifest));
}

#[test]
fn test_version_defaults_when_manifest_missing() {
    let dir = tempfile::tempdir().unwrap();
    let version = AppVersion::load(&dir.path().join("missing.yaml"));

    assert_eq!(version.value, env!("CARGO_PKG_VERSION"));
    assert!(matches!(version.source, VersionSource::Default(ref reason) if reason.contains("missing.yaml")));
}

#[test]
fn test_version_defaults_without_version_key() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("config.yaml");
    std::fs::write(&manifest, "name: Panel Config\n").unwrap();

    let version = AppVersion::load(&manifest);

    assert_eq!(version.value, env!("CARGO_PKG_VERSION"));
    assert!(matches!(version.source, VersionSource::Default(ref reason) if reason.contains("no version key")));
}

#[test]
fn test_version_defaults_on_malformed_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("config.yaml");
    std::fs::write(&manifest, "version: [unterminated\n").unwrap();

    let version = AppVersion::load(&manifest);
    assert!(matches!(version.source, VersionSource::Default(_)));
}
