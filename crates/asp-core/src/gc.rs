//! GC (C12): compute which snapshots and harness cache entries are still
//! reachable from a set of known lock files, then sweep everything else.
//!
//! "Known" lock files are whatever the caller hands in — typically every
//! project lock asp has touched plus `ASP_HOME`'s own global lock for
//! `run_global` targets. A lock this process has never seen can't keep
//! its spaces alive; that's an accepted tradeoff of content-addressed
//! garbage collection, not a bug.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use asp_store::{sweep, AspHome, GcReport};
use asp_types::{CommitSha, Integrity};

use crate::build::MATERIALIZE_ENV_HASH;
use crate::error::CoreError;
use crate::install::read_existing_lock;

pub struct GcInput<'a> {
    pub lock_paths: &'a [PathBuf],
    pub harness_ids: &'a [String],
    pub dry_run: bool,
}

pub fn gc(home: &AspHome, input: GcInput<'_>) -> Result<GcReport, CoreError> {
    let mut reachable_snapshot_hex = HashSet::new();
    let mut reachable_cache_keys = HashSet::new();

    for lock_path in input.lock_paths {
        let Some(doc) = read_existing_lock(lock_path)? else { continue };
        for (key, space) in &doc.spaces {
            let cache_dimension = match &key.commit {
                CommitSha::Dev => format!("dev:{}", key.id),
                CommitSha::Project => format!("project:{}", key.id),
                CommitSha::Sha(_) => {
                    if let Integrity::Sha256(hex) = &space.integrity {
                        reachable_snapshot_hex.insert(hex.clone());
                    }
                    space.integrity.to_string()
                }
            };
            for harness_id in input.harness_ids {
                reachable_cache_keys.insert((harness_id.clone(), MATERIALIZE_ENV_HASH.to_string(), cache_dimension.clone()));
            }
        }
    }

    Ok(sweep(home, &reachable_snapshot_hex, &reachable_cache_keys, input.dry_run)?)
}

/// Discovers every `*.json` lock file under a directory of projects asp
/// has materialized from, for callers that don't track their own list of
/// known projects. Non-recursive: one level of project directories, each
/// holding its own `asp-lock.json` at the root.
pub fn discover_project_locks(projects_root: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let mut out = Vec::new();
    if !projects_root.is_dir() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(projects_root).map_err(|e| CoreError::io(projects_root.display(), e))? {
        let entry = entry.map_err(|e| CoreError::io(projects_root.display(), e))?;
        let lock_path = entry.path().join("asp-lock.json");
        if lock_path.is_file() {
            out.push(lock_path);
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asp_closure::{build_closure, Registry};
    use asp_git::GitAdapter;
    use asp_lock::{assemble_target, to_json_string, LockDocument, RegistryRef, LOCKFILE_VERSION, RESOLVER_VERSION};
    use asp_store::cache::ensure_cached;
    use asp_store::StoreError;
    use std::collections::BTreeMap;

    fn write_space(dir: &Path, id: &str) {
        let space_dir = dir.join("spaces").join(id);
        std::fs::create_dir_all(&space_dir).unwrap();
        std::fs::write(space_dir.join("space.toml"), format!("schema = 1\nid = \"{id}\"\nversion = \"1.0.0\"\n")).unwrap();
    }

    fn write_dev_lock(lock_path: &Path, project_dir: &Path) {
        write_space(project_dir, "base");
        let registry = Registry::new(GitAdapter::new(project_dir), project_dir);
        let closure = build_closure(&registry, &["space:base@dev".to_string()], None).unwrap();
        let (target, spaces) = assemble_target(&["space:base@dev".to_string()], &closure, &BTreeMap::new());
        let mut targets = BTreeMap::new();
        targets.insert("default".to_string(), target);
        let doc = LockDocument {
            lockfile_version: LOCKFILE_VERSION,
            resolver_version: RESOLVER_VERSION,
            generated_at: chrono::Utc::now(),
            registry: RegistryRef { kind: "git".to_string(), url: "https://example.invalid/registry".to_string(), default_branch: None },
            spaces,
            targets,
        };
        std::fs::write(lock_path, to_json_string(&doc).unwrap()).unwrap();
    }

    #[test]
    fn sweeps_cache_entries_not_reachable_from_any_known_lock() {
        let project = tempfile::tempdir().unwrap();
        let lock_path = project.path().join("asp-lock.json");
        write_dev_lock(&lock_path, project.path());

        let home = AspHome::new(tempfile::tempdir().unwrap().path());
        home.ensure_dirs().unwrap();
        ensure_cached(&home, "claude", MATERIALIZE_ENV_HASH, "dev:base", |staging| {
            std::fs::write(staging.join("marker"), b"x").map_err(|e| StoreError::io(staging.display(), e))
        })
        .unwrap();
        ensure_cached(&home, "claude", MATERIALIZE_ENV_HASH, "dev:orphan", |staging| {
            std::fs::write(staging.join("marker"), b"x").map_err(|e| StoreError::io(staging.display(), e))
        })
        .unwrap();

        let input = GcInput { lock_paths: &[lock_path], harness_ids: &["claude".to_string()], dry_run: false };
        let report = gc(&home, input).unwrap();

        assert!(home.cache_dir("claude", MATERIALIZE_ENV_HASH, "dev:base").is_dir());
        assert!(!home.cache_dir("claude", MATERIALIZE_ENV_HASH, "dev:orphan").is_dir());
        assert_eq!(report.removed_cache_entries, vec![("claude".to_string(), MATERIALIZE_ENV_HASH.to_string(), "dev:orphan".to_string())]);
    }

    #[test]
    fn missing_lock_file_is_treated_as_empty_not_an_error() {
        let home = AspHome::new(tempfile::tempdir().unwrap().path());
        home.ensure_dirs().unwrap();
        let input = GcInput { lock_paths: &[PathBuf::from("/nonexistent/asp-lock.json")], harness_ids: &["claude".to_string()], dry_run: true };
        let report = gc(&home, input).unwrap();
        assert!(report.removed_snapshots.is_empty());
        assert!(report.removed_cache_entries.is_empty());
    }
}
