use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::sandbox;

/// File name of the default staging slot, directly under the config root.
pub const DEFAULT_SLOT_FILE: &str = "site_settings_staging.json";

/// A site configuration as consumed by the panels.
///
/// Only the fields the store touches are typed; everything else is carried
/// through untouched so a save/load cycle never loses data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub site_meta: SiteMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_info: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// `YYYY-MM-DD`, stamped on every save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    /// The document served when nothing has been published yet.
    pub fn new_site(last_updated: impl Into<String>) -> Self {
        let object = |value: Value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        };

        Self {
            site_meta: SiteMeta {
                version: Some("1.0".to_string()),
                last_updated: Some(last_updated.into()),
                extra: Map::new(),
            },
            site_info: object(json!({
                "site_name": "My Home",
                "guest_ssid": "",
                "guest_wifi_password": "",
            })),
            defaults: object(json!({
                "cover_opening_time": "08:00",
                "cover_closing_time": "19:00",
                "climate_check_interval": 60,
                "site_cover_up_time": 14300,
                "site_cover_down_time": 11500,
            })),
            devices: Some(Vec::new()),
            extra: Map::new(),
        }
    }

    pub fn device_count(&self) -> usize {
        self.devices.as_ref().map_or(0, Vec::len)
    }
}

/// A staging slot: the default one, or a named file in the staging directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Slot {
    #[default]
    Default,
    Named(String),
}

impl Slot {
    /// Build a named slot from a client-supplied name. Directory components
    /// are stripped and a `.json` suffix is added when missing. Returns `None`
    /// when no usable file name remains.
    pub fn named(name: &str) -> Option<Self> {
        let mut file_name = sandbox::sanitize_filename(name)?;
        if !file_name.ends_with(".json") {
            file_name.push_str(".json");
        }
        Some(Slot::Named(file_name))
    }

    /// File name of the slot (`site_settings_staging.json` for the default).
    pub fn file_name(&self) -> &str {
        match self {
            Slot::Default => DEFAULT_SLOT_FILE,
            Slot::Named(name) => name,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Where a save landed.
#[derive(Debug, Clone, Serialize)]
pub struct SlotDescriptor {
    pub name: String,
    pub path: PathBuf,
}

/// Listing entry for a named staging slot.
#[derive(Debug, Clone, Serialize)]
pub struct SlotInfo {
    pub name: String,
    pub modified: DateTime<Local>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveSource {
    /// Read from the published live file.
    Published,
    /// Nothing usable was published; a fresh default document.
    Default,
}

#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub document: ConfigDocument,
    pub source: LiveSource,
}

/// Result of a save immediately followed by promotion.
#[derive(Debug, Clone, Serialize)]
pub struct Promotion {
    pub staging: SlotDescriptor,
    pub live_path: PathBuf,
}

/// Result of importing an uploaded document into the default slot.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub slot: SlotDescriptor,
    pub document: ConfigDocument,
}
