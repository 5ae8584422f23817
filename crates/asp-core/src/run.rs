//! Run (C12): build into a fresh `ASP_HOME/tmp` subdirectory, then hand
//! the harness adapter's `buildRunArgs`/`buildRunEnv` to a child process.
//!
//! Three sub-modes share the materialize/compose core in `build.rs` and
//! differ only in where (and whether) a lock is read and written:
//! - project mode resolves a named target out of `asp-targets.toml` and
//!   reads/writes the project's own lock;
//! - global mode wraps a single `space:<id>@<sel>` ref in a synthetic
//!   `_global` target and reads/writes `ASP_HOME`'s global lock;
//! - dev mode points straight at a filesystem path and never touches a
//!   lock at all.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use asp_closure::{build_closure, Registry};
use asp_git::GitAdapter;
use asp_harness::{Bundle, HarnessRegistry, RunOptions};
use asp_store::AspHome;
use asp_types::{Target, Warning};

use crate::build::{build, materialize_and_compose, BuildInput, LintOptions};
use crate::cancel::CancellationToken;
use crate::error::CoreError;
use crate::install::{install, InstallInput};
use crate::project::{project_lock_path, read_project_manifest};

pub const GLOBAL_TARGET_NAME: &str = "_global";

static TMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct RunContext<'a> {
    pub home: &'a AspHome,
    pub harnesses: &'a HarnessRegistry,
    pub harness_id: &'a str,
    pub run_lint: bool,
    pub dry_run: bool,
    pub registry_url: String,
}

pub struct RunOutcome {
    pub bundle: Bundle,
    pub program: String,
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub warnings: Vec<Warning>,
    /// `None` in dry-run mode, where the child is never spawned.
    pub exit_code: Option<i32>,
}

/// Project mode: `target` names an entry in `project_dir/asp-targets.toml`.
/// `registry_dir` is the registry's own git working copy, which is usually
/// a different directory from the project consuming it; `project_dir` is
/// still used as the `base_dir` for `space:project:`/`space:path:` refs.
pub async fn run_project(
    ctx: &RunContext<'_>,
    project_dir: &Path,
    registry_dir: &Path,
    target_name: &str,
    options: RunOptions,
    cancel: &CancellationToken,
) -> Result<RunOutcome, CoreError> {
    let manifest = read_project_manifest(project_dir)?;
    let lock_path = project_lock_path(project_dir);
    let registry = Registry::new(GitAdapter::new(registry_dir), project_dir);

    let build_input = BuildInput {
        lock_path: &lock_path,
        project_targets: &manifest.targets,
        target_name,
        output_dir: &fresh_tmp_dir(ctx.home)?,
        harness_id: ctx.harness_id,
        clean: true,
        auto_install: true,
        run_lint: ctx.run_lint,
        registry_url: ctx.registry_url.clone(),
    };
    let outcome = build(ctx.home, &registry, ctx.harnesses, build_input, cancel).await?;
    execute(ctx, outcome, options, cancel)
}

/// Global mode: a single `space:<id>@<sel>` ref with no project, wrapped
/// in a synthetic `_global` target and pinned against `ASP_HOME`'s own
/// lock rather than a project's.
pub async fn run_global(
    ctx: &RunContext<'_>,
    registry_dir: &Path,
    space_ref: &str,
    options: RunOptions,
    cancel: &CancellationToken,
) -> Result<RunOutcome, CoreError> {
    let lock_path = ctx.home.global_lock_path();
    let registry = Registry::new(GitAdapter::new(registry_dir), registry_dir);

    let mut targets = BTreeMap::new();
    targets.insert(GLOBAL_TARGET_NAME.to_string(), Target { compose: vec![space_ref.to_string()], description: None });

    let build_input = BuildInput {
        lock_path: &lock_path,
        project_targets: &targets,
        target_name: GLOBAL_TARGET_NAME,
        output_dir: &fresh_tmp_dir(ctx.home)?,
        harness_id: ctx.harness_id,
        clean: true,
        auto_install: true,
        run_lint: ctx.run_lint,
        registry_url: ctx.registry_url.clone(),
    };
    let outcome = build(ctx.home, &registry, ctx.harnesses, build_input, cancel).await?;
    execute(ctx, outcome, options, cancel)
}

/// Dev mode: `path` is a filesystem directory holding a `space.toml`,
/// addressed directly rather than through a project or the registry.
/// No lock is read or written.
pub async fn run_dev(
    ctx: &RunContext<'_>,
    cwd: &Path,
    path: &str,
    options: RunOptions,
    cancel: &CancellationToken,
) -> Result<RunOutcome, CoreError> {
    cancel.check()?;
    let adapter = ctx.harnesses.get(ctx.harness_id).map_err(CoreError::Harness)?;
    let registry = Registry::new(GitAdapter::new(cwd), cwd);
    let space_ref = format!("space:path:{path}@dev");

    let closure = build_closure(&registry, &[space_ref], None)
        .map_err(|source| CoreError::Closure { target: path.to_string(), source })?;

    cancel.check()?;
    let output_dir = fresh_tmp_dir(ctx.home)?;
    let build_outcome = materialize_and_compose(
        ctx.home,
        &registry,
        adapter,
        &closure,
        "dev",
        &output_dir,
        true,
        LintOptions { run_lint: ctx.run_lint, lock_present: false },
        cancel,
    )?;
    execute(ctx, build_outcome, options, cancel)
}

fn fresh_tmp_dir(home: &AspHome) -> Result<PathBuf, CoreError> {
    home.ensure_dirs().map_err(|e| CoreError::io(home.root().display(), e))?;
    let n = TMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = home.tmp_dir().join(format!("run-{}-{n}", std::process::id()));
    std::fs::create_dir_all(&dir).map_err(|e| CoreError::io(dir.display(), e))?;
    Ok(dir)
}

fn execute(
    ctx: &RunContext<'_>,
    outcome: crate::build::BuildOutcome,
    options: RunOptions,
    cancel: &CancellationToken,
) -> Result<RunOutcome, CoreError> {
    cancel.check()?;
    let adapter = ctx.harnesses.get(ctx.harness_id).map_err(CoreError::Harness)?;
    let program = adapter.program();
    let argv = adapter.build_run_args(&outcome.bundle, &options);
    let env = adapter.build_run_env(&outcome.bundle);

    let exit_code = if ctx.dry_run {
        None
    } else {
        let mut command = Command::new(&program);
        command.args(&argv).envs(env.iter().cloned()).stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let status = command.status().map_err(|e| CoreError::io(program.clone(), e))?;
        let code = status.code().unwrap_or(-1);
        if code != 0 {
            return Err(CoreError::HarnessExit { harness_id: adapter.id().to_string(), exit_code: code });
        }
        Some(code)
    };

    Ok(RunOutcome { bundle: outcome.bundle, program, argv, env, warnings: outcome.warnings, exit_code })
}
