//! Reads `asp-targets.toml` from a project directory.

use std::path::Path;

use asp_types::ProjectManifest;

use crate::error::CoreError;

pub const PROJECT_MANIFEST_FILE: &str = "asp-targets.toml";

pub fn read_project_manifest(project_dir: &Path) -> Result<ProjectManifest, CoreError> {
    let path = project_dir.join(PROJECT_MANIFEST_FILE);
    let text = std::fs::read_to_string(&path).map_err(|e| CoreError::io(path.display(), e))?;
    toml::from_str(&text).map_err(|source| CoreError::TomlParse { path: path.display().to_string(), source })
}

pub fn project_lock_path(project_dir: &Path) -> std::path::PathBuf {
    project_dir.join("asp-lock.json")
}
