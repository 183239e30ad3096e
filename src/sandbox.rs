//! Confines client-supplied directory and file names to a fixed root.

use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Path '{requested}' escapes its root")]
    Forbidden { requested: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SandboxError::Forbidden { .. } => ErrorKind::Forbidden,
            SandboxError::Io(_) => ErrorKind::Fatal,
        }
    }
}

/// Join `requested` onto `root` and canonicalize the result.
///
/// The root itself must exist. The requested path may name directories that
/// do not exist yet: the deepest existing ancestor is canonicalized (so
/// symlinks are followed) and the remaining components are applied lexically.
/// Fails with `Forbidden` when the result does not lie within the canonical
/// root, which covers `..` segments, absolute paths and symlink escapes.
pub fn resolve(root: &Path, requested: impl AsRef<Path>) -> Result<PathBuf, SandboxError> {
    let requested = requested.as_ref();
    let root = root.canonicalize()?;
    let forbidden = || SandboxError::Forbidden {
        requested: requested.display().to_string(),
    };

    let resolved = canonicalize_lenient(&root.join(requested)).ok_or_else(forbidden)?;
    if !resolved.starts_with(&root) {
        tracing::warn!(
            root = %root.display(),
            requested = %requested.display(),
            resolved = %resolved.display(),
            "Rejected path outside sandbox root"
        );
        return Err(forbidden());
    }

    Ok(resolved)
}

/// Strip every directory component from a client-supplied file name.
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// is left (empty, `.`, `..`, or a name containing NUL).
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        _ if last.contains('\0') => None,
        _ => Some(last.to_string()),
    }
}

/// Returns `None` when an existing entry (e.g. a dangling symlink) cannot be
/// resolved.
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();

    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        if fs::symlink_metadata(&prefix).is_err() {
            continue;
        }

        let mut resolved = prefix.canonicalize().ok()?;
        for component in &components[split..] {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
        return Some(resolved);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_canonicalize_applies_missing_components_lexically() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();

        let resolved = canonicalize_lenient(&base.join("new/nested/../leaf")).unwrap();
        assert_eq!(resolved, base.join("new/leaf"));
    }

    #[cfg(unix)]
    #[test]
    fn lenient_canonicalize_rejects_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink(dir.path().join("missing-target"), &link).unwrap();

        assert!(canonicalize_lenient(&link.join("child")).is_none());
    }
}
