use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use super::models::{
    ConfigDocument, ImportSummary, LiveConfig, LiveSource, Promotion, Slot, SlotDescriptor,
    SlotInfo,
};
use crate::error::ErrorKind;

/// File name of the published configuration inside the live directory.
pub const LIVE_FILE: &str = "site_settings.json";

const STAGING_DIR: &str = "staging";
const BACKUP_DIR: &str = "backups";
const BACKUP_TIMESTAMP: &str = "%Y%m%d_%H%M%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Staging config not found: {0}")]
    NotFound(String),
    #[error("Invalid configuration in {name}: {reason}")]
    InvalidFormat { name: String, reason: String },
    #[error("Invalid slot name: '{0}'")]
    InvalidSlotName(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidFormat { .. } => ErrorKind::InvalidFormat,
            StoreError::InvalidSlotName(_) => ErrorKind::ValidationFailed,
            StoreError::Serialization(_) | StoreError::Io(_) => ErrorKind::Fatal,
        }
    }
}

/// Staging slots, their backups, and the live file.
///
/// Layout:
/// - `{config_root}/site_settings_staging.json`: default slot
/// - `{config_root}/site_settings_staging_backup_{stamp}.json`: its backups
/// - `{config_root}/staging/{name}.json`: named slots
/// - `{config_root}/staging/backups/{stem}_backup_{stamp}.json`: their backups
/// - `{live_root}/site_settings.json`: live config
///
/// Every write goes to a temp file in the destination directory followed by
/// a rename, so readers only ever see complete documents. There is no
/// locking: concurrent writers to the same slot race and the last one wins.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_root: PathBuf,
    staging_dir: PathBuf,
    live_path: PathBuf,
}

impl ConfigStore {
    /// Open the store, creating the config, staging and live directories.
    pub fn open<P: AsRef<Path>, L: AsRef<Path>>(
        config_root: P,
        live_root: L,
    ) -> Result<Self, StoreError> {
        let config_root = config_root.as_ref().to_path_buf();
        let staging_dir = config_root.join(STAGING_DIR);
        let live_root = live_root.as_ref();

        fs::create_dir_all(&staging_dir)?;
        fs::create_dir_all(live_root)?;

        Ok(Self {
            config_root,
            staging_dir,
            live_path: live_root.join(LIVE_FILE),
        })
    }

    pub fn slot_path(&self, slot: &Slot) -> PathBuf {
        match slot {
            Slot::Default => self.config_root.join(slot.file_name()),
            Slot::Named(name) => self.staging_dir.join(name),
        }
    }

    pub fn live_path(&self) -> &Path {
        &self.live_path
    }

    /// Stamp `last_updated`, default `devices`, and write the document to
    /// `slot`. Existing slot content is copied to a backup first.
    pub fn save(
        &self,
        mut document: ConfigDocument,
        slot: &Slot,
    ) -> Result<SlotDescriptor, StoreError> {
        document.site_meta.last_updated = Some(Local::now().format(DATE_FORMAT).to_string());
        document.devices.get_or_insert_with(Vec::new);

        let contents = serde_json::to_vec_pretty(&document)?;
        self.commit(slot, &contents)
    }

    /// Copy the slot's current bytes over the live file.
    ///
    /// The staging slot is left as it is, so promotion can be repeated.
    pub fn promote(&self, slot: &Slot) -> Result<PathBuf, StoreError> {
        let contents = self.read_slot(slot)?;
        write_atomic(&self.live_path, &contents)?;

        tracing::info!(
            slot = %slot,
            live = %self.live_path.display(),
            "Promoted staging config to live"
        );
        Ok(self.live_path.clone())
    }

    /// Save to the default slot, then promote it.
    ///
    /// If the promotion fails the live file keeps its previous content and
    /// a later `promote` finishes the job.
    pub fn save_and_promote(&self, document: ConfigDocument) -> Result<Promotion, StoreError> {
        let staging = self.save(document, &Slot::Default)?;
        let live_path = self.promote(&Slot::Default)?;
        Ok(Promotion { staging, live_path })
    }

    /// Named slots, most recently modified first.
    pub fn list(&self) -> Result<Vec<SlotInfo>, StoreError> {
        let mut slots = Vec::new();

        for entry in fs::read_dir(&self.staging_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            // Entries can disappear between read_dir and stat
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                continue;
            }

            slots.push(SlotInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                modified: DateTime::<Local>::from(metadata.modified()?),
                size_bytes: metadata.len(),
            });
        }

        slots.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(slots)
    }

    pub fn load(&self, slot: &Slot) -> Result<ConfigDocument, StoreError> {
        let contents = self.read_slot(slot)?;
        let document = parse_document(slot.file_name(), &contents)?;
        tracing::debug!(slot = %slot, "Loaded staging config");
        Ok(document)
    }

    pub fn delete(&self, slot: &Slot) -> Result<(), StoreError> {
        let path = self.slot_path(slot);
        fs::remove_file(&path).map_err(|e| not_found_or(e, slot))?;
        tracing::info!(slot = %slot, path = %path.display(), "Deleted staging config");
        Ok(())
    }

    /// The published document, or a fresh default when nothing usable is
    /// published. Never writes anything.
    pub fn get_live(&self) -> Result<LiveConfig, StoreError> {
        let contents = match fs::read(&self.live_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No live config found, serving default");
                return Ok(default_live());
            }
            Err(e) => return Err(e.into()),
        };

        match parse_document(LIVE_FILE, &contents) {
            Ok(document) => {
                tracing::debug!(path = %self.live_path.display(), "Loaded live config");
                Ok(LiveConfig {
                    document,
                    source: LiveSource::Published,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "Live config is unreadable, serving default");
                Ok(default_live())
            }
        }
    }

    /// Replace the default slot with an uploaded document.
    ///
    /// The upload must be a JSON object carrying a `devices` array. It is
    /// stored as uploaded (no `last_updated` stamp), with the usual backup.
    pub fn import(&self, contents: &[u8]) -> Result<ImportSummary, StoreError> {
        let raw: serde_json::Value =
            serde_json::from_slice(contents).map_err(|e| StoreError::InvalidFormat {
                name: "import".to_string(),
                reason: e.to_string(),
            })?;
        if !raw.get("devices").is_some_and(serde_json::Value::is_array) {
            return Err(StoreError::InvalidFormat {
                name: "import".to_string(),
                reason: "missing 'devices' array".to_string(),
            });
        }

        let document: ConfigDocument =
            serde_json::from_value(raw).map_err(|e| StoreError::InvalidFormat {
                name: "import".to_string(),
                reason: e.to_string(),
            })?;
        let slot = self.commit(&Slot::Default, &serde_json::to_vec_pretty(&document)?)?;

        tracing::info!(devices = document.device_count(), "Imported config to staging");
        Ok(ImportSummary { slot, document })
    }

    /// Copy the default slot into the named slot `target`.
    pub fn export(&self, target: &Slot) -> Result<SlotDescriptor, StoreError> {
        let contents = self.read_slot(&Slot::Default)?;
        self.commit(target, &contents)
    }

    fn commit(&self, slot: &Slot, contents: &[u8]) -> Result<SlotDescriptor, StoreError> {
        let path = self.slot_path(slot);

        if let Some(backup) = self.back_up(slot, &path)? {
            tracing::info!(slot = %slot, backup = %backup.display(), "Backed up staging config");
        }
        write_atomic(&path, contents)?;

        tracing::info!(slot = %slot, path = %path.display(), "Saved staging config");
        Ok(SlotDescriptor {
            name: slot.file_name().to_string(),
            path,
        })
    }

    /// Copy the slot's current bytes to a timestamped backup. Two backups
    /// taken within the same second share a name; the later one wins.
    fn back_up(&self, slot: &Slot, path: &Path) -> Result<Option<PathBuf>, StoreError> {
        let previous = match fs::read(path) {
            Ok(previous) => previous,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let backup = self.backup_path(slot, &Local::now().format(BACKUP_TIMESTAMP).to_string());
        if let Some(parent) = backup.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&backup, &previous)?;
        Ok(Some(backup))
    }

    pub fn backup_path(&self, slot: &Slot, stamp: &str) -> PathBuf {
        let name = slot.file_name();
        let stem = name.strip_suffix(".json").unwrap_or(name);
        let file_name = format!("{stem}_backup_{stamp}.json");
        match slot {
            Slot::Default => self.config_root.join(file_name),
            Slot::Named(_) => self.staging_dir.join(BACKUP_DIR).join(file_name),
        }
    }

    fn read_slot(&self, slot: &Slot) -> Result<Vec<u8>, StoreError> {
        fs::read(self.slot_path(slot)).map_err(|e| not_found_or(e, slot))
    }
}

fn default_live() -> LiveConfig {
    LiveConfig {
        document: ConfigDocument::new_site(Local::now().format(DATE_FORMAT).to_string()),
        source: LiveSource::Default,
    }
}

fn parse_document(name: &str, contents: &[u8]) -> Result<ConfigDocument, StoreError> {
    serde_json::from_slice(contents).map_err(|e| StoreError::InvalidFormat {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn not_found_or(e: io::Error, slot: &Slot) -> StoreError {
    if e.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(slot.file_name().to_string())
    } else {
        StoreError::Io(e)
    }
}

/// Write `contents` to a uniquely named temp file next to `path`, flush it
/// to disk, then rename it into place.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let result = (|| -> io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        // Best-effort cleanup; the destination is untouched
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
