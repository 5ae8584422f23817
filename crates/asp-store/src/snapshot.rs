//! Content-addressed snapshot store: `createSnapshot`, `verifySnapshot`,
//! `deleteSnapshot`, `listSnapshots`, `getSnapshotSize`.

use std::path::Path;

use asp_git::GitAdapter;
use asp_integrity::blob_oid;
use asp_types::{Integrity, SpaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::home::AspHome;
use crate::stage::stage_and_rename;
use crate::StoreError;

pub const SNAPSHOT_METADATA_FILE: &str = ".asp-snapshot.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub space_id: String,
    pub commit: String,
    pub integrity: String,
    pub created_at: DateTime<Utc>,
    pub source_path: String,
}

fn integrity_hex(integrity: &Integrity) -> Result<&str, StoreError> {
    match integrity {
        Integrity::Sha256(hex) => Ok(hex),
        Integrity::Dev | Integrity::Project => Err(StoreError::NotContentAddressed),
    }
}

pub fn snapshot_exists(home: &AspHome, integrity: &Integrity) -> Result<bool, StoreError> {
    let hex = integrity_hex(integrity)?;
    Ok(home.snapshot_dir(hex).is_dir())
}

/// Extract `<commit>:<path>` into the store, keyed by its canonical
/// integrity. A no-op if the destination already exists; concurrent
/// writers either both succeed or one loses the rename race (the
/// extracted content is identical either way).
pub fn create_snapshot(
    home: &AspHome,
    git: &GitAdapter,
    id: &SpaceId,
    commit: &str,
    registry_relative_path: &str,
) -> Result<(Integrity, std::path::PathBuf), StoreError> {
    let integrity = asp_integrity::hash_tree(git, commit, registry_relative_path)
        .map_err(|source| StoreError::Integrity { space_id: id.to_string(), commit: commit.to_string(), source })?;
    let hex = integrity_hex(&integrity)?.to_string();
    let dest = home.snapshot_dir(&hex);

    if dest.is_dir() {
        return Ok((integrity, dest));
    }

    home.ensure_dirs().map_err(|e| StoreError::Io { path: home.root().display().to_string(), source: e })?;

    let id_owned = id.clone();
    let commit_owned = commit.to_string();
    let path_owned = registry_relative_path.to_string();
    let integrity_str = integrity.to_string();

    stage_and_rename(&home.tmp_dir(), &dest, &format!("snapshot-{hex}"), |staging| {
        git.archive_extract(&commit_owned, Some(&path_owned), staging)
            .map_err(|source| StoreError::Snapshot { space_id: id_owned.to_string(), commit: commit_owned.clone(), source: source.into() })?;
        let metadata = SnapshotMetadata {
            space_id: id_owned.to_string(),
            commit: commit_owned.clone(),
            integrity: integrity_str.clone(),
            created_at: chrono_now(),
            source_path: path_owned.clone(),
        };
        let json = serde_json::to_string_pretty(&metadata).map_err(|e| StoreError::Json { path: SNAPSHOT_METADATA_FILE.to_string(), source: e })?;
        std::fs::write(staging.join(SNAPSHOT_METADATA_FILE), json)
            .map_err(|e| StoreError::Io { path: staging.join(SNAPSHOT_METADATA_FILE).display().to_string(), source: e })?;
        Ok(())
    })?;

    Ok((integrity, dest))
}

/// Timestamps are stamped at call sites rather than inside pure logic,
/// but the store itself is the one place that legitimately needs
/// "now" for snapshot metadata.
fn chrono_now() -> DateTime<Utc> {
    Utc::now()
}

/// Rehash the directory's actual contents (recomputing git-style blob
/// OIDs) and compare against `integrity`. Missing directories, I/O
/// errors, and hash mismatches are all reported as `false`, never an
/// error — callers decide what to do about an unverifiable snapshot.
pub fn verify_snapshot(home: &AspHome, integrity: &Integrity) -> bool {
    let Ok(hex) = integrity_hex(integrity) else { return false };
    let dir = home.snapshot_dir(hex);
    if !dir.is_dir() {
        return false;
    }
    match rehash_directory(&dir) {
        Ok(actual) => actual == *integrity,
        Err(_) => false,
    }
}

fn rehash_directory(dir: &Path) -> Result<Integrity, StoreError> {
    use asp_integrity::is_excluded;
    use asp_git::{TreeEntry, TreeEntryType};

    let mut entries = Vec::new();
    walk(dir, dir, &mut entries)?;
    let entries: Vec<TreeEntry> = entries
        .into_iter()
        .filter(|(rel, _, _)| !is_excluded(rel))
        .map(|(rel, content, executable)| TreeEntry {
            mode: if executable { "100755".to_string() } else { "100644".to_string() },
            entry_type: TreeEntryType::Blob,
            oid: blob_oid(&content),
            path: rel,
        })
        .collect();
    Ok(asp_integrity::hash_entries(&entries))
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>, bool)>) -> Result<(), StoreError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| StoreError::Io { path: dir.display().to_string(), source: e })?;
    for entry in read_dir {
        let entry = entry.map_err(|e| StoreError::Io { path: dir.display().to_string(), source: e })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| StoreError::Io { path: path.display().to_string(), source: e })?;
        if file_type.is_dir() {
            walk(root, &path, out)?;
        } else if file_type.is_file() {
            let content = std::fs::read(&path).map_err(|e| StoreError::Io { path: path.display().to_string(), source: e })?;
            let executable = is_executable(&path);
            let rel = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
            out.push((rel, content, executable));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

pub fn delete_snapshot(home: &AspHome, integrity: &Integrity) -> Result<(), StoreError> {
    let hex = integrity_hex(integrity)?;
    let dir = home.snapshot_dir(hex);
    if dir.is_dir() {
        std::fs::remove_dir_all(&dir).map_err(|e| StoreError::Io { path: dir.display().to_string(), source: e })?;
    }
    Ok(())
}

/// Lists directory names under `snapshots/` that look like 64-hex
/// integrities; non-hash directories are ignored.
pub fn list_snapshots(home: &AspHome) -> Result<Vec<String>, StoreError> {
    let dir = home.snapshots_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(&dir).map_err(|e| StoreError::Io { path: dir.display().to_string(), source: e })? {
        let entry = entry.map_err(|e| StoreError::Io { path: dir.display().to_string(), source: e })?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hex64(&name) {
            out.push(name);
        }
    }
    out.sort();
    Ok(out)
}

fn is_hex64(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

pub fn snapshot_size(home: &AspHome, integrity: &Integrity) -> Result<u64, StoreError> {
    let hex = integrity_hex(integrity)?;
    let dir = home.snapshot_dir(hex);
    dir_size(&dir).map_err(|e| StoreError::Io { path: dir.display().to_string(), source: e })
}

fn dir_size(dir: &Path) -> std::io::Result<u64> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut total = 0u64;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_hex64_rejects_non_hash_dirs() {
        assert!(is_hex64(&"a".repeat(64)));
        assert!(!is_hex64(&"a".repeat(63)));
        assert!(!is_hex64("tmp"));
        assert!(!is_hex64(&"A".repeat(64)));
    }

    #[test]
    fn verify_missing_snapshot_is_false_not_error() {
        let td = tempfile::tempdir().unwrap();
        let home = AspHome::new(td.path());
        let integrity = Integrity::of_hex("a".repeat(64));
        assert!(!verify_snapshot(&home, &integrity));
    }

    #[test]
    fn dev_and_project_integrities_are_never_stored() {
        let td = tempfile::tempdir().unwrap();
        let home = AspHome::new(td.path());
        assert!(matches!(snapshot_exists(&home, &Integrity::Dev), Err(StoreError::NotContentAddressed)));
        assert!(matches!(snapshot_exists(&home, &Integrity::Project), Err(StoreError::NotContentAddressed)));
    }
}
