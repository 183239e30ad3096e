mod cursor;
pub mod gate;

pub use cursor::{Marker, MarkerCursor};
pub use gate::{inspect, Encoding, FrameInfo, Rejection, Verdict};

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::sandbox::{self, SandboxError};

const ACCEPTED_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Only .jpg and .jpeg files are accepted, got '{0}'")]
    UnsupportedExtension(String),
    #[error("Invalid file name: '{0}'")]
    InvalidFilename(String),
    #[error("Asset directory not found: {0}")]
    DirectoryNotFound(String),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssetError::UnsupportedExtension(_) | AssetError::InvalidFilename(_) => {
                ErrorKind::ValidationFailed
            }
            AssetError::DirectoryNotFound(_) => ErrorKind::NotFound,
            AssetError::Sandbox(e) => e.kind(),
            AssetError::Rejected(r) => r.kind(),
            AssetError::Io(_) => ErrorKind::Fatal,
        }
    }
}

/// An image admitted into an asset directory.
#[derive(Debug, Clone, Serialize)]
pub struct ImageAsset {
    pub directory: String,
    pub filename: String,
    pub width: u16,
    pub height: u16,
    pub encoding: Encoding,
    pub byte_size: u64,
    #[serde(skip)]
    pub path: PathBuf,
}

/// A file already present in an asset directory.
#[derive(Debug, Clone, Serialize)]
pub struct AssetEntry {
    pub filename: String,
    pub byte_size: u64,
}

/// Served asset tree. Every directory handed to it is resolved through the
/// sandbox, and every file passes the gate before a byte hits the disk.
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, std::io::Error> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate `data` and write it as `{root}/{directory}/{filename}`.
    ///
    /// The directory is created on demand, but only after the gate accepted
    /// the image. The file appears under its final name atomically.
    pub async fn admit(
        &self,
        directory: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<ImageAsset, AssetError> {
        let filename = sandbox::sanitize_filename(filename)
            .ok_or_else(|| AssetError::InvalidFilename(filename.to_string()))?;
        if !has_accepted_extension(&filename) {
            return Err(AssetError::UnsupportedExtension(filename));
        }

        let dir = sandbox::resolve(&self.root, directory)?;

        let frame = match gate::inspect(&data) {
            Verdict::Accepted(frame) => frame,
            Verdict::Rejected(rejection) => {
                tracing::info!(
                    directory = %directory,
                    filename = %filename,
                    reason = %rejection,
                    "Rejected image upload"
                );
                return Err(rejection.into());
            }
        };

        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&filename);
        write_atomic(&dir, &path, &data).await?;

        tracing::info!(
            path = %path.display(),
            bytes = data.len(),
            "Admitted image asset"
        );

        Ok(ImageAsset {
            directory: directory.to_string(),
            filename,
            width: frame.width,
            height: frame.height,
            encoding: frame.encoding,
            byte_size: data.len() as u64,
            path,
        })
    }

    /// List the accepted images in `directory`, sorted by file name.
    pub async fn list(&self, directory: &str) -> Result<Vec<AssetEntry>, AssetError> {
        let dir = sandbox::resolve(&self.root, directory)?;
        if !dir.is_dir() {
            return Err(AssetError::DirectoryNotFound(directory.to_string()));
        }

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if filename.starts_with('.') || !has_accepted_extension(&filename) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                entries.push(AssetEntry {
                    filename,
                    byte_size: metadata.len(),
                });
            }
        }

        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(entries)
    }
}

fn has_accepted_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Write to a hidden temp file in `dir`, then rename over `path`.
async fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> Result<(), std::io::Error> {
    let tmp_path = dir.join(format!(".upload-{}.tmp", uuid::Uuid::new_v4()));
    let result = match tokio::fs::write(&tmp_path, data).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        // Best-effort cleanup of the orphaned temp file
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    result
}
