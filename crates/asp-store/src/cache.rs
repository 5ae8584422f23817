//! Per-harness materialized-artifact cache, keyed by `(harness, envHash,
//! integrity)`. Distinct from the snapshot store: a snapshot is a space's
//! raw tree; a cache entry is what `asp-materialize` built from it for a
//! specific harness and environment.

use std::path::PathBuf;

use crate::home::AspHome;
use crate::stage::stage_and_rename;
use crate::StoreError;

pub fn cache_path(home: &AspHome, harness_id: &str, env_hash: &str, integrity_hex: &str) -> PathBuf {
    home.cache_dir(harness_id, env_hash, integrity_hex)
}

pub fn cache_exists(home: &AspHome, harness_id: &str, env_hash: &str, integrity_hex: &str) -> bool {
    cache_path(home, harness_id, env_hash, integrity_hex).is_dir()
}

/// Materialize into the cache if absent, otherwise return the existing
/// entry untouched. `build` receives the staging directory to populate;
/// its content becomes the cache entry once renamed into place.
pub fn ensure_cached(
    home: &AspHome,
    harness_id: &str,
    env_hash: &str,
    integrity_hex: &str,
    build: impl FnOnce(&std::path::Path) -> Result<(), StoreError>,
) -> Result<PathBuf, StoreError> {
    let dest = cache_path(home, harness_id, env_hash, integrity_hex);
    if dest.is_dir() {
        return Ok(dest);
    }
    home.ensure_dirs().map_err(|e| StoreError::io(home.root().display(), e))?;
    let label = format!("cache-{harness_id}-{integrity_hex}");
    stage_and_rename(&home.tmp_dir(), &dest, &label, build)?;
    Ok(dest)
}

pub fn delete_cache_entry(
    home: &AspHome,
    harness_id: &str,
    env_hash: &str,
    integrity_hex: &str,
) -> Result<(), StoreError> {
    let dir = cache_path(home, harness_id, env_hash, integrity_hex);
    if dir.is_dir() {
        std::fs::remove_dir_all(&dir).map_err(|e| StoreError::io(dir.display(), e))?;
    }
    Ok(())
}

/// Walks `cache/<harness>/<envHash>/<integrity>` and returns every
/// `(harness_id, env_hash, integrity_hex)` triple currently present.
pub fn list_cache_entries(home: &AspHome) -> Result<Vec<(String, String, String)>, StoreError> {
    let root = home.cache_root();
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for harness_entry in read_dirs(&root)? {
        let harness_id = file_name(&harness_entry);
        for env_entry in read_dirs(&harness_entry)? {
            let env_hash = file_name(&env_entry);
            for integrity_entry in read_dirs(&env_entry)? {
                out.push((harness_id.clone(), env_hash.clone(), file_name(&integrity_entry)));
            }
        }
    }
    out.sort();
    Ok(out)
}

fn read_dirs(dir: &std::path::Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| StoreError::io(dir.display(), e))? {
        let entry = entry.map_err(|e| StoreError::io(dir.display(), e))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_cached_is_idempotent_and_readable_after() {
        let td = tempfile::tempdir().unwrap();
        let home = AspHome::new(td.path());
        let mut calls = 0;
        let path = ensure_cached(&home, "claude", "envhash1", &"a".repeat(64), |staging| {
            calls += 1;
            std::fs::write(staging.join("marker"), b"x").map_err(|e| StoreError::io(staging.display(), e))
        })
        .unwrap();
        assert!(path.join("marker").is_file());

        let path2 = ensure_cached(&home, "claude", "envhash1", &"a".repeat(64), |_staging| {
            calls += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(path, path2);
        assert_eq!(calls, 1, "second call must not rebuild an existing cache entry");
    }
}
