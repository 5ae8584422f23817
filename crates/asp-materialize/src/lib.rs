//! Per-space cacheable artifact builder (C8): plugin manifest synthesis,
//! component linking, hook-format translation, and the MCP server merge
//! consumed by the target composer.

pub mod hooks;
pub mod link;
pub mod mcp;
pub mod plugin_manifest;

use std::path::{Path, PathBuf};

use asp_types::SpaceManifest;

pub use hooks::{read_hooks, render_hooks_json, AbstractHooks, HookEntry};
pub use link::{link_components, COMPONENT_DIRS};
pub use mcp::{merge_mcp_servers, McpConfig, McpMergeWarning};
pub use plugin_manifest::{build_plugin_manifest, PluginManifest};

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("i/o error at {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk {path}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
    #[error("malformed hooks.toml at {path}")]
    HooksToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("malformed hooks.json at {path}")]
    HooksJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize plugin manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl MaterializeError {
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        MaterializeError::Io { path: path.to_string(), source }
    }
}

#[derive(Debug, Clone)]
pub struct MaterializedArtifact {
    pub artifact_path: PathBuf,
    pub files: Vec<String>,
    pub warnings: Vec<String>,
}

/// Builds one space's harness-agnostic cacheable artifact into `dest`:
/// the plugin manifest (returned for the caller to write at the
/// harness-specific path/name), linked component directories, and the
/// hook set translated to the abstract in-memory form with script
/// executability enforced. Doesn't decide `dest`'s location or the
/// plugin manifest's on-disk filename — those are harness-specific
/// (asp-harness's job).
pub fn materialize_space(
    source: &Path,
    dest: &Path,
    manifest: &SpaceManifest,
    use_hardlinks: bool,
) -> Result<(PluginManifest, AbstractHooks, MaterializedArtifact), MaterializeError> {
    std::fs::create_dir_all(dest).map_err(|e| MaterializeError::io(dest.display(), e))?;

    let plugin = build_plugin_manifest(manifest);
    let files = link_components(source, dest, use_hardlinks)?;

    let hooks_src = source.join("hooks");
    let hooks = if hooks_src.is_dir() { read_hooks(&hooks_src)? } else { AbstractHooks::new() };

    let hooks_dest = dest.join("hooks");
    let mut warnings = if hooks_dest.is_dir() {
        hooks::ensure_hook_scripts_executable(&hooks_dest, &hooks)
    } else {
        Vec::new()
    };

    if !hooks.is_empty() {
        std::fs::create_dir_all(&hooks_dest).map_err(|e| MaterializeError::io(hooks_dest.display(), e))?;
        let rendered = render_hooks_json(&hooks);
        let text = serde_json::to_string_pretty(&rendered)?;
        let hooks_json_path = hooks_dest.join("hooks.json");
        std::fs::write(&hooks_json_path, text).map_err(|e| MaterializeError::io(hooks_json_path.display(), e))?;
    }

    warnings.sort();

    Ok((
        plugin,
        hooks,
        MaterializedArtifact { artifact_path: dest.to_path_buf(), files, warnings },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use asp_types::SpaceId;
    use std::collections::BTreeMap;

    fn manifest() -> SpaceManifest {
        SpaceManifest {
            schema: 1,
            id: SpaceId::parse("base").unwrap(),
            version: "1.0.0".to_string(),
            description: None,
            plugin: Default::default(),
            deps: Default::default(),
            settings: Default::default(),
            harness: Default::default(),
            harness_sections: BTreeMap::new(),
        }
    }

    #[test]
    fn materializes_components_and_translates_hooks() {
        let td = tempfile::tempdir().unwrap();
        let source = td.path().join("source");
        let dest = td.path().join("dest");
        std::fs::create_dir_all(source.join("commands")).unwrap();
        std::fs::write(source.join("commands").join("go.md"), b"# go").unwrap();
        std::fs::create_dir_all(source.join("hooks")).unwrap();
        std::fs::write(source.join("hooks").join("hooks.toml"), "[[pre_tool_use]]\ncommand = \"noop.sh\"\n").unwrap();

        let (plugin, hooks, artifact) = materialize_space(&source, &dest, &manifest(), true).unwrap();
        assert_eq!(plugin.name, "base");
        assert!(hooks.contains_key("pre_tool_use"));
        assert!(dest.join("commands").join("go.md").is_file());
        assert!(!artifact.files.is_empty());

        let hooks_json = std::fs::read_to_string(dest.join("hooks").join("hooks.json")).unwrap();
        let rendered: serde_json::Value = serde_json::from_str(&hooks_json).unwrap();
        assert_eq!(rendered["PreToolUse"][0]["hooks"][0]["command"], "noop.sh");
    }
}
