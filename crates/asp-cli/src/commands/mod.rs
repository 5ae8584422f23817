pub mod repo;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use asp_closure::{build_closure, Registry};
use asp_core::{
    build, install, project_lock_path, read_existing_lock, read_project_manifest, run_dev, run_global, run_project, BuildInput, CancellationToken, InstallInput,
    RunContext,
};
use asp_git::GitAdapter;
use asp_harness::{HarnessRegistry, RunOptions};
use asp_store::AspHome;
use asp_types::SpaceId;

use crate::render::{print_json, print_warnings};
use crate::reporter::{CliReporter, Reporter};
use crate::targets::{add_ref, require_target, write_project_manifest};

pub struct CommonPaths {
    pub project_dir: PathBuf,
    pub registry_dir: PathBuf,
    pub home: AspHome,
}

impl CommonPaths {
    pub fn new(project: Option<PathBuf>, registry: Option<PathBuf>, asp_home: Option<PathBuf>) -> Result<Self> {
        let project_dir = project.unwrap_or(std::env::current_dir()?);
        let registry_dir = registry.unwrap_or_else(|| project_dir.clone());
        let home = match asp_home {
            Some(root) => AspHome::new(root),
            None => AspHome::from_env(),
        };
        home.ensure_dirs().with_context(|| format!("preparing {}", home.root().display()))?;
        Ok(Self { project_dir, registry_dir, home })
    }
}

pub async fn run(
    paths: &CommonPaths,
    target_or_ref_or_path: &str,
    prompt: Option<String>,
    harness_id: &str,
    dry_run: bool,
    extra_args: Vec<String>,
    inherit_settings: bool,
    no_warnings: bool,
) -> Result<i32> {
    let harnesses = HarnessRegistry::default();
    let cancel = CancellationToken::new();
    let ctx = RunContext {
        home: &paths.home,
        harnesses: &harnesses,
        harness_id,
        run_lint: !no_warnings,
        dry_run,
        registry_url: format!("file://{}", paths.registry_dir.display()),
    };
    let options = RunOptions {
        model: None,
        permission_mode: None,
        setting_sources: if inherit_settings { Some("project".to_string()) } else { None },
        settings: None,
        debug_hooks: false,
        prompt,
        extra_args,
    };

    let result = if Path::new(target_or_ref_or_path).is_dir() {
        run_dev(&ctx, &paths.project_dir, target_or_ref_or_path, options, &cancel).await
    } else if target_or_ref_or_path.starts_with("space:") {
        run_global(&ctx, &paths.registry_dir, target_or_ref_or_path, options, &cancel).await
    } else {
        run_project(&ctx, &paths.project_dir, &paths.registry_dir, target_or_ref_or_path, options, &cancel).await
    };

    // Harness invocation failures propagate the harness's own exit code
    // rather than asp's generic failure code, so shells observe it
    // accurately (per the run/build propagation policy).
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(asp_core::CoreError::HarnessExit { harness_id, exit_code }) => {
            eprintln!("error: {harness_id} exited with status {exit_code}");
            return Ok(exit_code);
        }
        Err(e) => return Err(e.into()),
    };

    if dry_run {
        println!("{}", asp_harness::render_command(&outcome.program, &outcome.argv));
    }
    if !no_warnings {
        print_warnings(&outcome.warnings);
    }
    Ok(outcome.exit_code.unwrap_or(0))
}

#[allow(clippy::too_many_arguments)]
pub async fn build_target(
    paths: &CommonPaths,
    target_name: &str,
    output_dir: &Path,
    harness_id: &str,
    clean: bool,
    auto_install: bool,
    run_lint: bool,
) -> Result<()> {
    let manifest = read_project_manifest(&paths.project_dir)?;
    let lock_path = project_lock_path(&paths.project_dir);
    let registry = Registry::new(GitAdapter::new(&paths.registry_dir), &paths.project_dir);
    let harnesses = HarnessRegistry::default();
    let cancel = CancellationToken::new();

    let input = BuildInput {
        lock_path: &lock_path,
        project_targets: &manifest.targets,
        target_name,
        output_dir,
        harness_id,
        clean,
        auto_install,
        run_lint,
        registry_url: format!("file://{}", paths.registry_dir.display()),
    };
    let outcome = build(&paths.home, &registry, &harnesses, input, &cancel).await?;
    println!("built {target_name} -> {}", outcome.output_dir.display());
    print_warnings(&outcome.warnings);
    Ok(())
}

pub async fn install_all(paths: &CommonPaths, target_names: Option<Vec<String>>) -> Result<()> {
    let manifest = read_project_manifest(&paths.project_dir)?;
    let lock_path = project_lock_path(&paths.project_dir);
    let registry = Registry::new(GitAdapter::new(&paths.registry_dir), &paths.project_dir);
    let cancel = CancellationToken::new();

    let input = InstallInput {
        lock_path: &lock_path,
        targets: &manifest.targets,
        target_names: target_names.as_deref(),
        update: false,
        upgrade_ids: None,
        registry_url: format!("file://{}", paths.registry_dir.display()),
    };
    let doc = install(&paths.home, &registry, input, &cancel).await?;
    println!("installed {} target(s) into {}", doc.targets.len(), lock_path.display());
    Ok(())
}

pub async fn upgrade(paths: &CommonPaths, space_id: Option<&str>, target_name: Option<&str>) -> Result<()> {
    let manifest = read_project_manifest(&paths.project_dir)?;
    let lock_path = project_lock_path(&paths.project_dir);
    let registry = Registry::new(GitAdapter::new(&paths.registry_dir), &paths.project_dir);
    let cancel = CancellationToken::new();

    let target_names = target_name.map(|t| vec![t.to_string()]);
    let upgrade_ids: Option<HashSet<SpaceId>> = space_id.map(|id| -> Result<HashSet<SpaceId>> {
        Ok(HashSet::from([SpaceId::parse(id).map_err(|e| anyhow::anyhow!("{e}"))?]))
    }).transpose()?;

    let input = InstallInput {
        lock_path: &lock_path,
        targets: &manifest.targets,
        target_names: target_names.as_deref(),
        update: true,
        upgrade_ids: upgrade_ids.as_ref(),
        registry_url: format!("file://{}", paths.registry_dir.display()),
    };
    let doc = install(&paths.home, &registry, input, &cancel).await?;
    println!("upgraded; lock now has {} target(s)", doc.targets.len());
    Ok(())
}

pub fn add(paths: &CommonPaths, space_ref: &str, target_name: &str) -> Result<()> {
    let mut manifest = read_project_manifest(&paths.project_dir)?;
    add_ref(&mut manifest, target_name, space_ref)?;
    write_project_manifest(&paths.project_dir, &manifest)?;
    println!("added {space_ref} to target {target_name:?}");
    Ok(())
}

pub fn remove(paths: &CommonPaths, space_id: &str, target_name: &str) -> Result<()> {
    let mut manifest = read_project_manifest(&paths.project_dir)?;
    let id = SpaceId::parse(space_id).map_err(|e| anyhow::anyhow!("{e}"))?;
    let target = require_target(&manifest, target_name)?;
    let remaining = asp_lock::remove_space_refs(target_name, &target.compose, &id)?;
    manifest.targets.get_mut(target_name).expect("checked above").compose = remaining;
    write_project_manifest(&paths.project_dir, &manifest)?;
    println!("removed {space_id} from target {target_name:?}");
    Ok(())
}

pub fn explain(paths: &CommonPaths, target_name: Option<&str>, json: bool) -> Result<()> {
    let manifest = read_project_manifest(&paths.project_dir)?;
    let lock_path = project_lock_path(&paths.project_dir);
    let lock = read_existing_lock(&lock_path)?;

    let names: Vec<String> = match target_name {
        Some(name) => vec![name.to_string()],
        None => manifest.targets.keys().cloned().collect(),
    };

    for name in names {
        require_target(&manifest, &name)?;
        let closure = match &lock {
            Some(doc) if doc.targets.contains_key(&name) => None,
            _ => {
                let registry = Registry::new(GitAdapter::new(&paths.registry_dir), &paths.project_dir);
                let target = require_target(&manifest, &name)?;
                Some(build_closure(&registry, &target.compose, None).with_context(|| format!("resolving target {name:?}"))?)
            }
        };

        if json {
            match (&lock, &closure) {
                (Some(doc), _) if doc.targets.contains_key(&name) => print_json(&doc.targets[&name])?,
                (_, Some(closure)) => print_json(&closure.load_order)?,
                _ => unreachable!("either the lock has this target or a closure was computed"),
            }
            continue;
        }

        println!("target: {name}");
        match (&lock, &closure) {
            (Some(doc), _) if doc.targets.contains_key(&name) => {
                let locked = &doc.targets[&name];
                for key in &locked.load_order {
                    println!("  {key}");
                }
            }
            (_, Some(closure)) => {
                for key in &closure.load_order {
                    println!("  {key} (unresolved; no lock entry yet)");
                }
            }
            _ => {}
        }
        println!();
    }
    Ok(())
}

pub fn harnesses(json: bool) -> Result<()> {
    let registry = HarnessRegistry::default();
    if json {
        let results: Vec<_> = registry.ids().into_iter().map(|id| {
            let adapter = registry.get(&id).expect("id came from the registry itself");
            let detect = adapter.detect();
            serde_json::json!({
                "id": id,
                "name": adapter.name(),
                "models": adapter.models(),
                "available": detect.available,
                "version": detect.version,
            })
        }).collect();
        print_json(&results)?;
        return Ok(());
    }
    for id in registry.ids() {
        let adapter = registry.get(&id).expect("id came from the registry itself");
        let detect = adapter.detect();
        let status = if detect.available { "available" } else { "not found" };
        println!("{id} ({}): {status}", adapter.name());
    }
    Ok(())
}

pub fn doctor(home: &AspHome, json: bool) -> Result<()> {
    let registry = HarnessRegistry::default();
    let mut reporter = CliReporter;
    let harness_reports: Vec<_> = registry.ids().into_iter().map(|id| {
        let adapter = registry.get(&id).expect("id came from the registry itself");
        let detect = adapter.detect();
        if !detect.available {
            reporter.warn(&format!("{id} not detected: {}", detect.error.as_deref().unwrap_or("not found on PATH")));
        }
        (id, detect)
    }).collect();

    if json {
        print_json(&serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "asp_home": home.root(),
            "harnesses": harness_reports.iter().map(|(id, d)| serde_json::json!({
                "id": id, "available": d.available, "version": d.version, "path": d.path,
            })).collect::<Vec<_>>(),
        }))?;
        return Ok(());
    }

    println!("os: {}", std::env::consts::OS);
    println!("arch: {}", std::env::consts::ARCH);
    println!("asp_home: {}", home.root().display());
    println!();
    for (id, detect) in &harness_reports {
        let version = detect.version.as_deref().unwrap_or("unknown");
        println!("{id}: {} ({version})", if detect.available { "available" } else { "not found" });
    }
    Ok(())
}

pub fn lint(paths: &CommonPaths, target_name: Option<&str>, json: bool) -> Result<()> {
    let manifest = read_project_manifest(&paths.project_dir)?;
    let lock_path = project_lock_path(&paths.project_dir);
    let lock_present = lock_path.is_file();

    let names: Vec<String> = match target_name {
        Some(name) => vec![name.to_string()],
        None => manifest.targets.keys().cloned().collect(),
    };

    let registry = Registry::new(GitAdapter::new(&paths.registry_dir), &paths.project_dir);
    let mut warnings = Vec::new();
    for name in &names {
        let target = require_target(&manifest, name)?;
        let closure = build_closure(&registry, &target.compose, None).with_context(|| format!("resolving target {name:?}"))?;
        let spaces = closure
            .load_order
            .iter()
            .map(|key| asp_lint::LintSpace { key: key.clone(), manifest: closure.resolved[key].manifest.clone(), plugin_path: paths.registry_dir.join("spaces").join(key.id.as_str()) })
            .collect();
        let mut ctx = asp_lint::LintContext::new(spaces);
        ctx.lock_present = lock_present;
        warnings.extend(asp_lint::run(&ctx));
    }
    warnings.sort_by(|a, b| a.code.cmp(&b.code));

    if json {
        print_json(&warnings)?;
    } else {
        print_warnings(&warnings);
    }
    Ok(())
}

pub fn path(paths: &CommonPaths, space_id: &str) -> Result<()> {
    let id = SpaceId::parse(space_id).map_err(|e| anyhow::anyhow!("{e}"))?;
    let dir = paths.registry_dir.join("spaces").join(id.as_str());
    println!("{}", dir.display());
    Ok(())
}

pub fn completions(shell: clap_complete::Shell, cmd: &mut clap::Command) {
    clap_complete::generate(shell, cmd, "asp", &mut std::io::stdout());
}
