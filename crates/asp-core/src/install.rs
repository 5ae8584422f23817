//! Install (C12): resolve each target's closure, snapshot every
//! non-dev/non-project space it reaches, and persist the lock.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use asp_closure::{build_closure, Closure, Registry};
use asp_lock::{
    acquire_lock, assemble_target, from_json_str, pinned_spaces_for_install, to_json_string, validate, LockDocument,
    LockedSpace, LockedTarget, RegistryRef, LOCKFILE_VERSION, RESOLVER_VERSION,
};
use asp_store::AspHome;
use asp_types::{CommitSha, Integrity, SpaceId, SpaceKey, Target};

use crate::cancel::CancellationToken;
use crate::concurrency::{default_concurrency, parallel_map};
use crate::error::CoreError;

const LOCK_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct InstallInput<'a> {
    pub lock_path: &'a Path,
    pub targets: &'a BTreeMap<String, Target>,
    /// `None` installs every target in the project manifest.
    pub target_names: Option<&'a [String]>,
    pub update: bool,
    pub upgrade_ids: Option<&'a HashSet<SpaceId>>,
    pub registry_url: String,
}

/// Reads the lock at `lock_path` if present; a missing file is not an
/// error (first install of a project).
pub fn read_existing_lock(lock_path: &Path) -> Result<Option<LockDocument>, CoreError> {
    if !lock_path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(lock_path).map_err(|e| CoreError::io(lock_path.display(), e))?;
    let doc = from_json_str(&text).map_err(CoreError::LockSerialize)?;
    Ok(Some(doc))
}

fn advisory_lock_path(lock_path: &Path) -> PathBuf {
    lock_path.with_extension("lock")
}

pub async fn install(
    home: &AspHome,
    registry: &Registry,
    input: InstallInput<'_>,
    cancel: &CancellationToken,
) -> Result<LockDocument, CoreError> {
    cancel.check()?;
    let guard = acquire_lock(&advisory_lock_path(input.lock_path), LOCK_ACQUIRE_TIMEOUT)?;

    let old_lock = read_existing_lock(input.lock_path)?;

    let selected: Vec<String> = match input.target_names {
        Some(names) => names.to_vec(),
        None => input.targets.keys().cloned().collect(),
    };

    let mut spaces: BTreeMap<SpaceKey, LockedSpace> = old_lock.as_ref().map(|l| l.spaces.clone()).unwrap_or_default();
    let mut targets_out: BTreeMap<String, LockedTarget> = old_lock.as_ref().map(|l| l.targets.clone()).unwrap_or_default();

    for target_name in &selected {
        cancel.check()?;
        let target = input.targets.get(target_name).ok_or_else(|| CoreError::UnknownTarget { target: target_name.clone() })?;

        let pinned = pinned_spaces_for_install(old_lock.as_ref(), target_name, input.update, input.upgrade_ids);
        let closure = build_closure(registry, &target.compose, Some(&pinned))
            .map_err(|source| CoreError::Closure { target: target_name.clone(), source })?;

        cancel.check()?;
        let integrities = snapshot_closure(home, &registry.git, &closure, default_concurrency()).await?;

        let (locked_target, locked_spaces) = assemble_target(&target.compose, &closure, &integrities);
        spaces.extend(locked_spaces);
        targets_out.insert(target_name.clone(), locked_target);
    }

    let doc = LockDocument {
        lockfile_version: LOCKFILE_VERSION,
        resolver_version: RESOLVER_VERSION,
        generated_at: chrono::Utc::now(),
        registry: RegistryRef { kind: "git".to_string(), url: input.registry_url, default_branch: None },
        spaces,
        targets: targets_out,
    };
    validate(&doc)?;

    let text = to_json_string(&doc)?;
    write_lock_atomically(home, input.lock_path, &text)?;
    drop(guard);
    Ok(doc)
}

/// Creates a store snapshot (hash + extract) for every content-addressed
/// key the closure reaches, `default_concurrency()`-wide in parallel.
/// `dev`/`project` keys never need a snapshot: their integrity is fixed
/// by `assemble_target` itself.
async fn snapshot_closure(
    home: &AspHome,
    git: &asp_git::GitAdapter,
    closure: &Closure,
    cap: usize,
) -> Result<BTreeMap<SpaceKey, Integrity>, CoreError> {
    let sha_keys: Vec<SpaceKey> = closure
        .resolved
        .keys()
        .filter(|key| matches!(key.commit, CommitSha::Sha(_)))
        .cloned()
        .collect();

    let home = home.clone();
    let git = git.clone();
    let pairs = parallel_map(sha_keys, cap, move |key| {
        let rel = format!("spaces/{}", key.id);
        let (integrity, _dir) = asp_store::create_snapshot(&home, &git, &key.id, key.commit.as_str(), &rel)
            .map_err(|source| CoreError::Store { space_id: key.id.to_string(), commit: key.commit.to_string(), source })?;
        Ok((key, integrity))
    })
    .await?;

    Ok(pairs.into_iter().collect())
}

/// Stages the rendered lock JSON next to the destination and renames it
/// into place, matching the store's own stage-and-rename discipline.
fn write_lock_atomically(home: &AspHome, lock_path: &Path, text: &str) -> Result<(), CoreError> {
    home.ensure_dirs().map_err(|e| CoreError::io(home.root().display(), e))?;
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent.display(), e))?;
    }
    let staging = home.tmp_dir().join(format!("lock-{}.json", std::process::id()));
    std::fs::write(&staging, text).map_err(|e| CoreError::io(staging.display(), e))?;
    std::fs::rename(&staging, lock_path).map_err(|e| CoreError::io(lock_path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asp_closure::Registry;
    use asp_git::GitAdapter;

    fn write_space(dir: &Path, id: &str) {
        let space_dir = dir.join("spaces").join(id);
        std::fs::create_dir_all(&space_dir).unwrap();
        std::fs::write(space_dir.join("space.toml"), format!("schema = 1\nid = \"{id}\"\nversion = \"1.0.0\"\n")).unwrap();
    }

    #[tokio::test]
    async fn installs_a_single_dev_target_and_persists_a_lock() {
        let project = tempfile::tempdir().unwrap();
        write_space(project.path(), "base");
        let home = AspHome::new(tempfile::tempdir().unwrap().path());
        let registry = Registry::new(GitAdapter::new(project.path()), project.path());

        let mut targets = BTreeMap::new();
        targets.insert("default".to_string(), Target { compose: vec!["space:base@dev".to_string()], description: None });

        let lock_path = project.path().join("asp-lock.json");
        let input = InstallInput {
            lock_path: &lock_path,
            targets: &targets,
            target_names: None,
            update: false,
            upgrade_ids: None,
            registry_url: "https://example.invalid/registry".to_string(),
        };

        let cancel = CancellationToken::new();
        let doc = install(&home, &registry, input, &cancel).await.unwrap();
        assert!(lock_path.is_file());
        assert_eq!(doc.targets["default"].load_order.len(), 1);
    }
}
