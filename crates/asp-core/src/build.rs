//! Build (C12): materialize every space a target's closure resolves to
//! under the harness cache, compose the target bundle, optionally clean
//! first, and optionally attach lint warnings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use asp_closure::{build_closure, Registry};
use asp_git::GitAdapter;
use asp_harness::HarnessRegistry;
use asp_lint::{LintContext, LintSpace};
use asp_lock::LockDocument;
use asp_store::cache::ensure_cached;
use asp_store::AspHome;
use asp_types::{CommitSha, SpaceId, SpaceKey, Target, Warning};

use crate::cancel::CancellationToken;
use crate::error::CoreError;
use crate::install::{install, read_existing_lock, InstallInput};

/// Bumped when the on-disk shape `asp_materialize::materialize_space`
/// produces changes, so stale cache entries miss rather than being
/// served back under a new layout.
pub(crate) const MATERIALIZE_ENV_HASH: &str = "v1";

pub struct BuildInput<'a> {
    pub lock_path: &'a Path,
    pub project_targets: &'a BTreeMap<String, Target>,
    pub target_name: &'a str,
    pub output_dir: &'a Path,
    pub harness_id: &'a str,
    pub clean: bool,
    pub auto_install: bool,
    pub run_lint: bool,
    pub registry_url: String,
}

pub struct BuildOutcome {
    pub bundle: asp_harness::Bundle,
    pub output_dir: PathBuf,
    pub warnings: Vec<Warning>,
}

pub async fn build(
    home: &AspHome,
    registry: &Registry,
    harnesses: &HarnessRegistry,
    input: BuildInput<'_>,
    cancel: &CancellationToken,
) -> Result<BuildOutcome, CoreError> {
    cancel.check()?;
    let adapter = harnesses.get(input.harness_id).map_err(CoreError::Harness)?;

    let mut lock = read_existing_lock(input.lock_path)?;
    if lock.is_none() && input.auto_install {
        let target_names = vec![input.target_name.to_string()];
        lock = Some(
            install(
                home,
                registry,
                InstallInput {
                    lock_path: input.lock_path,
                    targets: input.project_targets,
                    target_names: Some(&target_names),
                    update: false,
                    upgrade_ids: None,
                    registry_url: input.registry_url.clone(),
                },
                cancel,
            )
            .await?,
        );
    }
    let lock = lock.ok_or(CoreError::UnknownTarget { target: input.target_name.to_string() })?;
    let target = input.project_targets.get(input.target_name).ok_or_else(|| CoreError::UnknownTarget { target: input.target_name.to_string() })?;

    cancel.check()?;
    let pinned = pinned_from_lock(&lock, input.target_name);
    let closure = build_closure(registry, &target.compose, Some(&pinned))
        .map_err(|source| CoreError::Closure { target: input.target_name.to_string(), source })?;

    materialize_and_compose(
        home,
        registry,
        adapter,
        &closure,
        input.target_name,
        input.output_dir,
        input.clean,
        LintOptions { run_lint: input.run_lint, lock_present: input.lock_path.is_file() },
        cancel,
    )
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LintOptions {
    pub run_lint: bool,
    pub lock_present: bool,
}

/// Materializes every space in `closure.load_order` under the harness
/// cache, composes the bundle, and optionally lints. Shared by project
/// builds (closure pinned from a lock) and dev-mode runs (closure
/// resolved fresh, no lock involved at all).
#[allow(clippy::too_many_arguments)]
pub(crate) fn materialize_and_compose(
    home: &AspHome,
    registry: &Registry,
    adapter: &dyn asp_harness::HarnessAdapter,
    closure: &asp_closure::Closure,
    target_name: &str,
    output_dir: &Path,
    clean: bool,
    lint: LintOptions,
    cancel: &CancellationToken,
) -> Result<BuildOutcome, CoreError> {
    let output_root = adapter.target_output_path(output_dir, target_name);
    if clean && output_root.is_dir() {
        std::fs::remove_dir_all(&output_root).map_err(|e| CoreError::io(output_root.display(), e))?;
    }

    cancel.check()?;
    let mut artifact_dirs = Vec::with_capacity(closure.load_order.len());
    let mut lint_spaces = Vec::with_capacity(closure.load_order.len());
    for key in &closure.load_order {
        let resolved = &closure.resolved[key];
        let (source_dir, cache_dimension) = space_source_dir(home, &registry.git, &registry.base_dir, key)?;

        let cache_dir = ensure_cached(home, adapter.id(), MATERIALIZE_ENV_HASH, &cache_dimension, |staging| {
            let materialize_input = asp_harness::MaterializeSpaceInput { space_dir: &source_dir, manifest: &resolved.manifest, use_hardlinks: true };
            adapter.materialize_space(&materialize_input, staging).map(|_| ()).map_err(|source| asp_store::StoreError::Cache {
                harness_id: adapter.id().to_string(),
                integrity_hex: cache_dimension.clone(),
                source: Box::new(source),
            })
        })
        .map_err(|source| CoreError::Store { space_id: key.id.to_string(), commit: key.commit.to_string(), source })?;

        lint_spaces.push(LintSpace { key: key.clone(), manifest: resolved.manifest.clone(), plugin_path: cache_dir.clone() });
        artifact_dirs.push(cache_dir);
    }

    let manifests: Vec<&asp_types::SpaceManifest> = closure.load_order.iter().map(|k| &closure.resolved[k].manifest).collect();
    let compose_input = asp_harness::ComposeTargetInput {
        target_name,
        keys: &closure.load_order,
        artifact_dirs: &artifact_dirs,
        manifests: &manifests,
        output_dir: &output_root,
    };
    let outcome = adapter
        .compose_target(&compose_input)
        .map_err(|source| CoreError::Materialize { harness_id: adapter.id().to_string(), space_id: target_name.to_string(), source })?;

    let mut warnings = outcome.warnings;
    if lint.run_lint {
        let mut ctx = LintContext::new(lint_spaces);
        ctx.lock_present = lint.lock_present;
        ctx.harness_id = Some(adapter.id().to_string());
        warnings.extend(asp_lint::run(&ctx));
    }

    Ok(BuildOutcome { bundle: outcome.bundle, output_dir: output_root, warnings })
}

/// Every `loadOrder` key from the lock, regardless of commit kind;
/// `asp_closure::build_closure` only consults this for `RefKind::Plain`
/// non-`dev` selectors, so including dev/project entries is harmless.
fn pinned_from_lock(lock: &LockDocument, target_name: &str) -> BTreeMap<SpaceId, CommitSha> {
    let mut pinned = BTreeMap::new();
    let Some(target) = lock.targets.get(target_name) else { return pinned };
    for key in &target.load_order {
        pinned.insert(key.id.clone(), key.commit.clone());
    }
    pinned
}

/// Where a resolved space's files live, and a string to key the harness
/// cache on. Dev spaces read straight from the project tree; `project:`
/// refs read from the consuming project's `spaces/` directory; everything
/// else is a snapshot, created on demand if the store doesn't already hold
/// it. `Dev`/`Project` commits aren't content-addressed, so `Integrity`'s
/// rendering of them is a fixed literal shared by every space of that
/// kind — the cache dimension folds the space id in alongside it so two
/// different dev spaces never collide on one cache entry.
fn space_source_dir(home: &AspHome, git: &GitAdapter, base_dir: &Path, key: &SpaceKey) -> Result<(PathBuf, String), CoreError> {
    match &key.commit {
        CommitSha::Dev => Ok((git.cwd().join("spaces").join(key.id.as_str()), format!("dev:{}", key.id))),
        CommitSha::Project => Ok((base_dir.join("spaces").join(key.id.as_str()), format!("project:{}", key.id))),
        CommitSha::Sha(commit) => {
            let rel = format!("spaces/{}", key.id);
            let (integrity, dir) = asp_store::create_snapshot(home, git, &key.id, commit, &rel)
                .map_err(|source| CoreError::Store { space_id: key.id.to_string(), commit: commit.clone(), source })?;
            Ok((dir, integrity.to_string()))
        }
    }
}
