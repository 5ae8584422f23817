//! `asp repo init|status|tags|publish|gc`: thin wrappers over `asp-git`
//! and `asp-core::gc`, reporting branch/dirty state for the registry
//! working copy asp operates against.

use std::path::Path;

use anyhow::{Context, Result};
use asp_core::{discover_project_locks, GcInput};
use asp_git::GitAdapter;
use asp_store::AspHome;

use crate::reporter::Reporter;

pub fn init(registry_dir: &Path) -> Result<()> {
    let git = GitAdapter::new(registry_dir);
    git.init().context("git init")?;
    std::fs::create_dir_all(registry_dir.join("spaces")).context("creating spaces/")?;
    std::fs::create_dir_all(registry_dir.join("registry")).context("creating registry/")?;
    let dist_tags = registry_dir.join("registry").join("dist-tags.json");
    if !dist_tags.is_file() {
        std::fs::write(&dist_tags, "{}\n").context("writing registry/dist-tags.json")?;
    }
    println!("initialized registry at {}", registry_dir.display());
    Ok(())
}

pub fn status(registry_dir: &Path) -> Result<()> {
    let git = GitAdapter::new(registry_dir);
    let commit = git.rev_parse("HEAD").ok();
    let branch = git.symbolic_ref("HEAD").ok().map(|r| r.trim_start_matches("refs/heads/").to_string());
    let clean = git.is_clean().context("git status")?;
    let remotes = git.remote_v().unwrap_or_default();

    println!("path: {}", registry_dir.display());
    println!("commit: {}", commit.as_deref().unwrap_or("(none)"));
    println!("branch: {}", branch.as_deref().unwrap_or("(detached)"));
    println!("clean: {clean}");
    for r in remotes {
        println!("remote: {} {} ({})", r.name, r.url, r.kind);
    }
    Ok(())
}

pub fn tags(registry_dir: &Path, space_id: Option<&str>) -> Result<()> {
    let git = GitAdapter::new(registry_dir);
    let pattern = match space_id {
        Some(id) => format!("space/{id}/v*"),
        None => "space/*/v*".to_string(),
    };
    let mut tags = git.tag_list(&pattern).context("listing tags")?;
    tags.sort();
    for tag in tags {
        println!("{tag}");
    }
    Ok(())
}

pub fn publish(registry_dir: &Path, space_id: &str, version: &str, remote: &str, reporter: &mut dyn Reporter) -> Result<()> {
    let git = GitAdapter::new(registry_dir);
    if !git.is_clean().context("git status")? {
        anyhow::bail!("registry working tree is not clean; commit space/{space_id} changes first");
    }
    let tag = format!("space/{space_id}/v{version}");
    git.tag_create(&tag, true, Some(&format!("{space_id} {version}"))).with_context(|| format!("creating tag {tag}"))?;
    git.tag_push(remote, &tag).with_context(|| format!("pushing tag {tag} to {remote}"))?;
    reporter.info(&format!("published {tag} to {remote}"));
    Ok(())
}

pub fn gc(home: &AspHome, projects_root: Option<&Path>, extra_lock: Option<&Path>, harness_ids: &[String], dry_run: bool) -> Result<()> {
    let mut lock_paths = match projects_root {
        Some(root) => discover_project_locks(root)?,
        None => Vec::new(),
    };
    lock_paths.push(home.global_lock_path());
    if let Some(extra) = extra_lock {
        lock_paths.push(extra.to_path_buf());
    }

    let report = asp_core::gc(home, GcInput { lock_paths: &lock_paths, harness_ids, dry_run })?;
    println!("removed_snapshots: {}", report.removed_snapshots.len());
    println!("removed_cache_entries: {}", report.removed_cache_entries.len());
    println!("bytes_freed: {}", report.bytes_freed);
    if report.dry_run {
        println!("(dry run; nothing was deleted)");
    }
    Ok(())
}
