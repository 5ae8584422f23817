//! The single `tmp → rename` idiom every write-once directory in the
//! store follows (design note: "concurrent staging"). A losing writer in
//! the rename race falls back to the already-present destination rather
//! than erroring, since content at a given integrity is identical by
//! construction.

use std::path::{Path, PathBuf};

use crate::StoreError;

/// Stage content into a fresh directory under `tmp_root` via `build`,
/// then atomically rename it into `dest`. If `dest` already exists when
/// the rename is attempted, that's treated as another writer having won
/// the race: the staging directory is discarded and `dest` is returned
/// as-is.
pub fn stage_and_rename(
    tmp_root: &Path,
    dest: &Path,
    label: &str,
    build: impl FnOnce(&Path) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    if dest.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(tmp_root).map_err(|e| StoreError::Io { path: tmp_root.display().to_string(), source: e })?;
    let staging: PathBuf = tmp_root.join(format!("{label}-{}", std::process::id()));
    if staging.exists() {
        std::fs::remove_dir_all(&staging).map_err(|e| StoreError::Io { path: staging.display().to_string(), source: e })?;
    }
    std::fs::create_dir_all(&staging).map_err(|e| StoreError::Io { path: staging.display().to_string(), source: e })?;

    let result = build(&staging);
    if let Err(e) = result {
        let _ = std::fs::remove_dir_all(&staging);
        return Err(e);
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io { path: parent.display().to_string(), source: e })?;
    }

    match std::fs::rename(&staging, dest) {
        Ok(()) => Ok(()),
        Err(_) if dest.exists() => {
            let _ = std::fs::remove_dir_all(&staging);
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_dir_all(&staging);
            Err(StoreError::Io { path: dest.display().to_string(), source: e })
        }
    }
}
