//! Reads and atomically rewrites `asp-targets.toml` for `add`/`remove`.
//! `asp-core::project` only reads this file; writing it back is the
//! CLI's job since only `add`/`remove`/`upgrade` ever mutate it.

use std::path::Path;

use anyhow::{bail, Context, Result};
use asp_types::ProjectManifest;

pub fn write_project_manifest(project_dir: &Path, manifest: &ProjectManifest) -> Result<()> {
    let path = project_dir.join(asp_core::PROJECT_MANIFEST_FILE);
    let text = toml::to_string_pretty(manifest).context("serializing asp-targets.toml")?;
    let staging = path.with_extension("toml.tmp");
    std::fs::write(&staging, &text).with_context(|| format!("writing {}", staging.display()))?;
    std::fs::rename(&staging, &path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

pub fn require_target<'a>(manifest: &'a ProjectManifest, target_name: &str) -> Result<&'a asp_types::Target> {
    manifest
        .targets
        .get(target_name)
        .ok_or_else(|| anyhow::anyhow!("no target named {target_name:?} in asp-targets.toml"))
}

pub fn add_ref(manifest: &mut ProjectManifest, target_name: &str, space_ref: &str) -> Result<()> {
    asp_refs::parse(space_ref).with_context(|| format!("parsing {space_ref:?}"))?;
    let target = manifest.targets.entry(target_name.to_string()).or_insert_with(|| asp_types::Target { compose: Vec::new(), description: None });
    if target.compose.iter().any(|e| e == space_ref) {
        bail!("target {target_name:?} already composes {space_ref:?}");
    }
    target.compose.push(space_ref.to_string());
    Ok(())
}
